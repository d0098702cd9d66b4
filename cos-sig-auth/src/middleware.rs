/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::signer::{RequestConfig, RequestSigner, SigningError, SigningScheme};
use bytes::Bytes;
use cos_auth::CredentialsCache;
use cos_types::credential::CredentialsError;
use cos_types::time::{SharedTimeSource, TimeSource};
use cos_types::{SigningRegion, SigningService};
use thiserror::Error;

/// Stage that authenticates outgoing requests
///
/// Credentials come from a [`CredentialsCache`], so a session's clients share a single retrieval.
/// The scheme follows the credentials: IAM tokens are sent as a bearer token, HMAC keys are
/// signed with SigV4.
#[derive(Clone, Debug)]
pub struct SigningStage {
    credentials: CredentialsCache,
    signer: RequestSigner,
    time: SharedTimeSource,
}

#[derive(Debug, Error)]
pub enum SigningStageError {
    #[error("Signing failed")]
    SigningFailure(#[from] SigningError),
    #[error("Failed to load credentials from the credentials provider")]
    CredentialsLoadingError(#[from] CredentialsError),
}

impl SigningStageError {
    pub fn code(&self) -> &str {
        match self {
            SigningStageError::SigningFailure(err) => err.code(),
            SigningStageError::CredentialsLoadingError(err) => err.code(),
        }
    }
}

impl SigningStage {
    pub fn new(credentials: CredentialsCache, signer: RequestSigner) -> Self {
        SigningStage {
            credentials,
            signer,
            time: SharedTimeSource::default(),
        }
    }

    pub fn with_time_source(mut self, time: SharedTimeSource) -> Self {
        self.time = time;
        self
    }

    pub async fn sign(
        &self,
        region: &SigningRegion,
        service: &SigningService,
        request: &mut http::Request<Bytes>,
    ) -> Result<SigningScheme, SigningStageError> {
        let credentials = self.credentials.get().await?;
        let request_config = RequestConfig {
            request_ts: self.time.now(),
            region,
            service,
        };
        Ok(self.signer.sign(&request_config, &credentials, request)?)
    }
}
