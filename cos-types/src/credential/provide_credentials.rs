/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::Credentials;
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A provider could not be constructed from its inputs
///
/// The error is computed once when the provider is built and every later retrieval reports an
/// equal error. It never heals: rebuild the provider once the configuration is fixed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderBuildError {
    /// No path to the compute resource token file was configured
    CrTokenFilePathNotFound,

    /// Neither a trusted profile name nor a trusted profile ID was configured
    TrustedProfileNotFound,

    /// `ibm_api_key_id` / `IBM_API_KEY_ID` was missing or empty
    ApiKeyNotFound { source: Cow<'static, str> },

    /// The shared file could not be read or parsed, or the profile was absent
    SharedFileLoad { message: String },
}

impl ProviderBuildError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ProviderBuildError::CrTokenFilePathNotFound => "crTokenFilePathNotFound",
            ProviderBuildError::TrustedProfileNotFound => "trustedProfileNotFound",
            ProviderBuildError::ApiKeyNotFound { .. } => "IbmApiKeyIdNotFound",
            ProviderBuildError::SharedFileLoad { .. } => "SharedCredsLoad",
        }
    }
}

impl Display for ProviderBuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProviderBuildError::CrTokenFilePathNotFound => {
                write!(f, "{}: CR token file path not found", self.code())
            }
            ProviderBuildError::TrustedProfileNotFound => write!(
                f,
                "{}: trusted profile name or trusted profile ID not found",
                self.code()
            ),
            ProviderBuildError::ApiKeyNotFound { source } => {
                write!(f, "{}: IBM API key ID not found in {}", self.code(), source)
            }
            ProviderBuildError::SharedFileLoad { message } => {
                write!(f, "{}: {}", self.code(), message)
            }
        }
    }
}

impl Error for ProviderBuildError {}

/// Failure to retrieve credentials
#[derive(Debug)]
#[non_exhaustive]
pub enum CredentialsError {
    /// The provider was invalid from construction
    InvalidProvider {
        provider_name: &'static str,
        error: ProviderBuildError,
    },

    /// The provider's token manager could not produce a token
    TokenRetrieve {
        provider_name: &'static str,
        source: BoxError,
    },

    /// The provider could not provide credentials or required configuration was not set
    ///
    /// Carries a code naming the missing source, e.g. `EnvAccessKeyNotFound`.
    CredentialsNotLoaded {
        code: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    /// Loading credentials from this provider exceeded the maximum allowed duration
    ProviderTimedOut(Duration),

    /// The provider experienced an error during credential resolution
    ProviderError(BoxError),

    /// Every provider of a chain failed
    ///
    /// `errors` lists each provider's failure in chain order when verbose chain errors are
    /// enabled and is empty otherwise.
    NoValidProviders { errors: Vec<CredentialsError> },

    /// An unexpected error occurred during credential resolution
    Unhandled(BoxError),
}

impl CredentialsError {
    pub fn not_loaded(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        CredentialsError::CredentialsNotLoaded {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn provider_error(err: impl Into<BoxError>) -> Self {
        CredentialsError::ProviderError(err.into())
    }

    /// Stable error code
    pub fn code(&self) -> &str {
        match self {
            CredentialsError::InvalidProvider { error, .. } => error.code(),
            CredentialsError::TokenRetrieve { .. } => "TokenManagerRetrieveError",
            CredentialsError::CredentialsNotLoaded { code, .. } => code.as_ref(),
            CredentialsError::ProviderTimedOut(_) => "ProviderTimedOut",
            CredentialsError::ProviderError(_) => "ProviderError",
            CredentialsError::NoValidProviders { .. } => "NoCredentialProviders",
            CredentialsError::Unhandled(_) => "Unhandled",
        }
    }
}

impl Display for CredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsError::InvalidProvider {
                provider_name,
                error,
            } => write!(f, "{} is not valid: {}", provider_name, error),
            CredentialsError::TokenRetrieve { provider_name, .. } => write!(
                f,
                "TokenManagerRetrieveError: error retrieving the token for {}",
                provider_name
            ),
            CredentialsError::CredentialsNotLoaded { code, message } => {
                write!(f, "{}: {}", code, message)
            }
            CredentialsError::ProviderTimedOut(d) => write!(
                f,
                "Credentials provider timed out after {} seconds",
                d.as_secs()
            ),
            CredentialsError::ProviderError(err) => {
                write!(f, "An error occurred while loading credentials: {}", err)
            }
            CredentialsError::NoValidProviders { errors } if errors.is_empty() => {
                write!(f, "NoCredentialProviders: no valid providers in chain")
            }
            CredentialsError::NoValidProviders { errors } => {
                write!(f, "NoCredentialProviders: no valid providers in chain")?;
                for err in errors {
                    write!(f, "\n\t{}", err)?;
                }
                Ok(())
            }
            CredentialsError::Unhandled(err) => write!(f, "Unexpected credentials error: {}", err),
        }
    }
}

impl Error for CredentialsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CredentialsError::InvalidProvider { error, .. } => Some(error as _),
            CredentialsError::TokenRetrieve { source, .. } => Some(source.as_ref() as _),
            CredentialsError::ProviderError(e) | CredentialsError::Unhandled(e) => {
                Some(e.as_ref() as _)
            }
            _ => None,
        }
    }
}

pub type Result = std::result::Result<Credentials, CredentialsError>;

pub mod future {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

    /// Future returned by [`ProvideCredentials`](super::ProvideCredentials)
    ///
    /// - When wrapping already loaded credentials, use [`ready`](ProvideCredentials::ready).
    /// - When wrapping asynchronously loaded credentials, use [`new`](ProvideCredentials::new).
    pub struct ProvideCredentials<'a>(BoxFuture<'a, super::Result>);

    impl<'a> ProvideCredentials<'a> {
        pub fn new(future: impl Future<Output = super::Result> + Send + 'a) -> Self {
            ProvideCredentials(Box::pin(future))
        }

        pub fn ready(credentials: super::Result) -> Self {
            ProvideCredentials::new(std::future::ready(credentials))
        }
    }

    impl Future for ProvideCredentials<'_> {
        type Output = super::Result;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            self.0.as_mut().poll(cx)
        }
    }
}

/// Asynchronous Credentials Provider
///
/// `is_expired` reports whether the credentials last returned by this provider must be
/// retrieved again. A caching layer asks it before every reuse.
pub trait ProvideCredentials: Send + Sync + Debug {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a;

    fn is_expired(&self) -> bool;
}

impl ProvideCredentials for Credentials {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(Ok(self.clone()))
    }

    fn is_expired(&self) -> bool {
        false
    }
}

impl ProvideCredentials for Arc<dyn ProvideCredentials> {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.as_ref().provide_credentials()
    }

    fn is_expired(&self) -> bool {
        self.as_ref().is_expired()
    }
}

/// Credentials provider wrapper that may be shared
#[derive(Clone, Debug)]
pub struct SharedCredentialsProvider(Arc<dyn ProvideCredentials>);

impl SharedCredentialsProvider {
    pub fn new(provider: impl ProvideCredentials + 'static) -> Self {
        Self(Arc::new(provider))
    }
}

impl AsRef<dyn ProvideCredentials> for SharedCredentialsProvider {
    fn as_ref(&self) -> &(dyn ProvideCredentials + 'static) {
        self.0.as_ref()
    }
}

impl From<Arc<dyn ProvideCredentials>> for SharedCredentialsProvider {
    fn from(provider: Arc<dyn ProvideCredentials>) -> Self {
        SharedCredentialsProvider(provider)
    }
}

impl ProvideCredentials for SharedCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.0.provide_credentials()
    }

    fn is_expired(&self) -> bool {
        self.0.is_expired()
    }
}
