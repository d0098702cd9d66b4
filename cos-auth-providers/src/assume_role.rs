/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credentials for a role assumed with the keys of another profile
//!
//! The SDK does not call STS itself: callers inject an [`AssumeRole`] implementation. When the
//! role requires MFA, the token code comes from a [`ProvideMfaToken`].

use cos_types::credential::provide_credentials::{self, future, ProvideCredentials};
use cos_types::credential::{CredentialsError, SharedCredentialsProvider};
use cos_types::time::{SharedTimeSource, TimeSource};
use cos_types::Credentials;
use std::error::Error;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type BoxError = Box<dyn Error + Send + Sync + 'static>;

pub const ASSUME_ROLE_PROVIDER_NAME: &str = "AssumeRoleProvider";

/// Role session lifetime requested when none is configured
pub const DEFAULT_DURATION: Duration = Duration::from_secs(15 * 60);

/// Parameters of one role assumption
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub role_session_name: String,
    pub external_id: Option<String>,
    pub serial_number: Option<String>,
    pub token_code: Option<String>,
    pub duration: Duration,
}

/// STS-style service that exchanges source credentials for role credentials
#[async_trait::async_trait]
pub trait AssumeRole: Send + Sync + Debug {
    async fn assume_role(
        &self,
        source: Credentials,
        request: AssumeRoleRequest,
    ) -> Result<Credentials, BoxError>;
}

/// Reference-counted [`AssumeRole`]
#[derive(Clone, Debug)]
pub struct SharedRoleAssumer(Arc<dyn AssumeRole>);

impl SharedRoleAssumer {
    pub fn new(assumer: impl AssumeRole + 'static) -> Self {
        SharedRoleAssumer(Arc::new(assumer))
    }
}

#[async_trait::async_trait]
impl AssumeRole for SharedRoleAssumer {
    async fn assume_role(
        &self,
        source: Credentials,
        request: AssumeRoleRequest,
    ) -> Result<Credentials, BoxError> {
        self.0.assume_role(source, request).await
    }
}

/// Failure to obtain an MFA token code
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MfaTokenError {
    #[error("An MFA token was requested but no provider was configured")]
    NoMfaTokenProviderConfigured,
    #[error("An error occurred while fetching an MFA token: {0}")]
    ProviderError(#[source] BoxError),
}

/// Source of MFA token codes
#[async_trait::async_trait]
pub trait ProvideMfaToken: Send + Sync + Debug {
    async fn mfa_token(&self) -> Result<String, MfaTokenError>;
}

/// Reference-counted [`ProvideMfaToken`]
#[derive(Clone, Debug)]
pub struct SharedMfaTokenProvider(Arc<dyn ProvideMfaToken>);

impl SharedMfaTokenProvider {
    pub fn new(provider: impl ProvideMfaToken + 'static) -> Self {
        SharedMfaTokenProvider(Arc::new(provider))
    }
}

#[async_trait::async_trait]
impl ProvideMfaToken for SharedMfaTokenProvider {
    async fn mfa_token(&self) -> Result<String, MfaTokenError> {
        self.0.mfa_token().await
    }
}

/// MFA token codes from an async closure, for example one that prompts the user
///
/// ```rust
/// use cos_auth_providers::assume_role::mfa_token_fn;
/// let mfa = mfa_token_fn(|| async { Ok("123456".to_string()) });
/// ```
pub fn mfa_token_fn<F, Fut>(f: F) -> MfaTokenFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, MfaTokenError>> + Send,
{
    MfaTokenFn { f }
}

/// See [`mfa_token_fn`]
#[derive(Copy, Clone)]
pub struct MfaTokenFn<F> {
    f: F,
}

impl<F> Debug for MfaTokenFn<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MfaTokenFn")
    }
}

#[async_trait::async_trait]
impl<F, Fut> ProvideMfaToken for MfaTokenFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, MfaTokenError>> + Send,
{
    async fn mfa_token(&self) -> Result<String, MfaTokenError> {
        (self.f)().await
    }
}

/// Assumes a role with the credentials of a source provider
///
/// The role credentials are reported expired once the expiry returned by the role assumer,
/// minus the expiry window, has passed. Credentials without an expiry are treated as expired
/// immediately.
#[derive(Debug)]
pub struct AssumeRoleProvider {
    source: SharedCredentialsProvider,
    assumer: SharedRoleAssumer,
    mfa: Option<SharedMfaTokenProvider>,
    request: AssumeRoleRequest,
    expiry_window: Duration,
    time: SharedTimeSource,
    expiry: Mutex<Option<SystemTime>>,
}

impl AssumeRoleProvider {
    pub fn builder(role_arn: impl Into<String>) -> Builder {
        Builder {
            role_arn: role_arn.into(),
            role_session_name: None,
            external_id: None,
            mfa_serial: None,
            mfa: None,
            duration: DEFAULT_DURATION,
            expiry_window: Duration::ZERO,
            time: None,
        }
    }

    pub fn role_arn(&self) -> &str {
        &self.request.role_arn
    }

    async fn credentials(&self) -> provide_credentials::Result {
        let source = self.source.provide_credentials().await?;
        let mut request = self.request.clone();
        if request.serial_number.is_some() {
            let mfa = self
                .mfa
                .as_ref()
                .ok_or(MfaTokenError::NoMfaTokenProviderConfigured)
                .map_err(CredentialsError::provider_error)?;
            request.token_code = Some(
                mfa.mfa_token()
                    .await
                    .map_err(CredentialsError::provider_error)?,
            );
        }
        tracing::debug!(role_arn = %request.role_arn, session = %request.role_session_name, "assuming role");
        let assumed = self
            .assumer
            .assume_role(source, request)
            .await
            .map_err(CredentialsError::ProviderError)?;
        self.set_expiry(assumed.expiry());
        let credentials = Credentials::from_keys(
            assumed.access_key_id(),
            assumed.secret_access_key(),
            assumed.session_token().map(str::to_string),
            ASSUME_ROLE_PROVIDER_NAME,
        );
        Ok(match assumed.expiry() {
            Some(expiry) => credentials.with_expiry(expiry),
            None => credentials,
        })
    }

    fn set_expiry(&self, expiry: Option<SystemTime>) {
        match self.expiry.lock() {
            Ok(mut guard) => *guard = expiry,
            Err(poisoned) => *poisoned.into_inner() = expiry,
        }
    }
}

impl ProvideCredentials for AssumeRoleProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }

    fn is_expired(&self) -> bool {
        let expiry = match self.expiry.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        match expiry {
            Some(expiry) => self.time.now() + self.expiry_window >= expiry,
            None => true,
        }
    }
}

/// Builder for [`AssumeRoleProvider`]
#[derive(Debug)]
pub struct Builder {
    role_arn: String,
    role_session_name: Option<String>,
    external_id: Option<String>,
    mfa_serial: Option<String>,
    mfa: Option<SharedMfaTokenProvider>,
    duration: Duration,
    expiry_window: Duration,
    time: Option<SharedTimeSource>,
}

impl Builder {
    /// Defaults to `cos-rust-sdk-<unix nanos>`
    pub fn role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = Some(name.into());
        self
    }

    pub fn set_role_session_name(&mut self, name: Option<String>) -> &mut Self {
        self.role_session_name = name;
        self
    }

    pub fn external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn set_external_id(&mut self, id: Option<String>) -> &mut Self {
        self.external_id = id;
        self
    }

    /// Serial number of the MFA device the role requires
    pub fn mfa_serial(mut self, serial: impl Into<String>) -> Self {
        self.mfa_serial = Some(serial.into());
        self
    }

    pub fn set_mfa_serial(&mut self, serial: Option<String>) -> &mut Self {
        self.mfa_serial = serial;
        self
    }

    pub fn mfa_token_provider(mut self, provider: SharedMfaTokenProvider) -> Self {
        self.mfa = Some(provider);
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Report the credentials expired this long before they actually expire
    pub fn expiry_window(mut self, window: Duration) -> Self {
        self.expiry_window = window;
        self
    }

    pub fn time_source(mut self, time: SharedTimeSource) -> Self {
        self.time = Some(time);
        self
    }

    pub fn build(
        self,
        source: SharedCredentialsProvider,
        assumer: SharedRoleAssumer,
    ) -> AssumeRoleProvider {
        let time = self.time.unwrap_or_default();
        let role_session_name = self
            .role_session_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| default_session_name(time.now()));
        AssumeRoleProvider {
            source,
            assumer,
            mfa: self.mfa,
            request: AssumeRoleRequest {
                role_arn: self.role_arn,
                role_session_name,
                external_id: self.external_id.filter(|id| !id.is_empty()),
                serial_number: self.mfa_serial.filter(|serial| !serial.is_empty()),
                token_code: None,
                duration: self.duration,
            },
            expiry_window: self.expiry_window,
            time,
            expiry: Mutex::new(None),
        }
    }
}

fn default_session_name(now: SystemTime) -> String {
    let nanos = now
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    format!("cos-rust-sdk-{}", nanos)
}
