/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! IAM token management for the IBM Cloud Object Storage SDK
//!
//! - [`iam`]: clients that exchange an API key or a compute resource token for an IAM token
//! - [`token_manager`]: keeps one live token, refreshes it before expiry
//! - [`credentials_cache`]: caches the credentials of any provider until it reports expiry

pub mod credentials_cache;
pub mod iam;
pub mod token_manager;

mod timeout;

use std::borrow::Cow;
use std::error::Error;
use std::time::Duration;

pub use credentials_cache::CredentialsCache;
pub use token_manager::{ManageToken, SharedTokenManager, TokenManager};

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Failure to obtain an IAM token
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TokenError {
    /// The token request could not be built
    #[error("failed to build token request: {0}")]
    InvalidRequest(Cow<'static, str>),

    /// The token request could not be sent
    #[error("failed to send token request: {0}")]
    Dispatch(#[source] BoxError),

    /// The token service rejected the request
    #[error("token service responded with status {status}: {message}")]
    Service { status: u16, message: String },

    /// The token service response was not a valid token
    #[error("invalid token response: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    /// The compute resource token file could not be read
    #[error("failed to read CR token file {path}: {source}")]
    CrTokenRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The token source did not answer in time
    #[error("token refresh timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// A caller-supplied token source failed
    #[error("token source failed: {0}")]
    Issuer(#[source] BoxError),
}

impl TokenError {
    pub fn issuer(err: impl Into<BoxError>) -> Self {
        TokenError::Issuer(err.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidRequest(_) => "InvalidTokenRequest",
            TokenError::Dispatch(_) => "RequestError",
            TokenError::Service { .. } => "ServiceError",
            TokenError::InvalidResponse(_) => "SerializationError",
            TokenError::CrTokenRead { .. } => "CrTokenFileReadError",
            TokenError::Timeout(_) => "TokenRefreshTimeout",
            TokenError::Issuer(_) => "TokenSourceError",
        }
    }
}
