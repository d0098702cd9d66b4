/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use bytes::Bytes;
use cos_types::{Credentials, SigningRegion, SigningService};
use http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use std::error::Error;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

pub const SERVICE_INSTANCE_ID_HEADER: &str = "ibm-service-instance-id";

const EXPIRATION_WARNING: &str = "Signing a request with an IAM token that has already expired. \
    The request will likely be rejected.";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SigningError {
    #[error("credentials of type oauth carry no IAM token")]
    MissingToken,

    #[error("HMAC credentials require a SigV4 signer but none was configured")]
    NoSigV4Signer,

    #[error("credential material is not a valid header value")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("SigV4 signing failed")]
    SigV4(#[source] BoxError),
}

impl SigningError {
    pub fn code(&self) -> &'static str {
        match self {
            SigningError::MissingToken => "MissingToken",
            SigningError::NoSigV4Signer => "NoSigV4Signer",
            SigningError::InvalidHeaderValue(_) => "InvalidHeaderValue",
            SigningError::SigV4(_) => "SigningFailure",
        }
    }
}

/// How a request is authenticated for a given set of credentials
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SigningScheme {
    /// `Authorization: Bearer <IAM token>`
    Bearer,
    SigV4,
}

impl SigningScheme {
    pub fn for_credentials(credentials: &Credentials) -> Self {
        if credentials.provider_type().is_oauth() {
            SigningScheme::Bearer
        } else {
            SigningScheme::SigV4
        }
    }
}

/// Signing Configuration for an individual Request
///
/// These fields may vary on a per-request basis
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestConfig<'a> {
    pub request_ts: SystemTime,
    pub region: &'a SigningRegion,
    pub service: &'a SigningService,
}

/// SigV4 signing, supplied by the caller
pub trait SignRequest: Send + Sync + Debug {
    fn sign(
        &self,
        request_config: &RequestConfig<'_>,
        credentials: &Credentials,
        request: &mut http::Request<Bytes>,
    ) -> Result<(), BoxError>;
}

#[derive(Clone, Debug)]
pub struct SharedRequestSigner(Arc<dyn SignRequest>);

impl SharedRequestSigner {
    pub fn new(signer: impl SignRequest + 'static) -> Self {
        SharedRequestSigner(Arc::new(signer))
    }
}

impl SignRequest for SharedRequestSigner {
    fn sign(
        &self,
        request_config: &RequestConfig<'_>,
        credentials: &Credentials,
        request: &mut http::Request<Bytes>,
    ) -> Result<(), BoxError> {
        self.0.sign(request_config, credentials, request)
    }
}

/// Authenticates requests with whichever scheme the credentials call for
///
/// Bearer signing is built in. SigV4 signing is delegated to the signer passed to
/// [`with_sigv4`](RequestSigner::with_sigv4).
#[derive(Clone, Debug, Default)]
pub struct RequestSigner {
    sigv4: Option<SharedRequestSigner>,
}

impl RequestSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sigv4(mut self, signer: impl SignRequest + 'static) -> Self {
        self.sigv4 = Some(SharedRequestSigner::new(signer));
        self
    }

    pub fn sign(
        &self,
        request_config: &RequestConfig<'_>,
        credentials: &Credentials,
        request: &mut http::Request<Bytes>,
    ) -> Result<SigningScheme, SigningError> {
        let scheme = SigningScheme::for_credentials(credentials);
        match scheme {
            SigningScheme::Bearer => sign_bearer(request_config, credentials, request)?,
            SigningScheme::SigV4 => self
                .sigv4
                .as_ref()
                .ok_or(SigningError::NoSigV4Signer)?
                .sign(request_config, credentials, request)
                .map_err(SigningError::SigV4)?,
        }
        tracing::trace!(scheme = ?scheme, provider = credentials.provider_name(), "signed request");
        Ok(scheme)
    }
}

fn sign_bearer(
    request_config: &RequestConfig<'_>,
    credentials: &Credentials,
    request: &mut http::Request<Bytes>,
) -> Result<(), SigningError> {
    let token = credentials.token().ok_or(SigningError::MissingToken)?;
    if token.expiration_time() <= request_config.request_ts {
        tracing::warn!(EXPIRATION_WARNING);
    }
    let mut authorization = HeaderValue::from_str(&token.authorization())?;
    authorization.set_sensitive(true);
    let headers = request.headers_mut();
    headers.insert(AUTHORIZATION, authorization);
    if let Some(instance_id) = credentials.service_instance_id() {
        headers.insert(
            HeaderName::from_static(SERVICE_INSTANCE_ID_HEADER),
            HeaderValue::from_str(instance_id)?,
        );
    }
    Ok(())
}
