/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::credential::Token;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::SystemTime;
use zeroize::Zeroizing;

/// How a set of [`Credentials`] authenticates requests
///
/// The request pipeline signs `OAuth` credentials with a bearer token and everything else with
/// SigV4.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ProviderType {
    /// IAM bearer token issued for an API key, a trusted profile or a custom token source
    OAuth,
    /// HMAC access key and secret
    Hmac,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OAuth => "oauth",
            ProviderType::Hmac => "hmac",
        }
    }

    pub fn is_oauth(&self) -> bool {
        matches!(self, ProviderType::OAuth)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials returned by a single retrieval
///
/// A `Credentials` value is produced fresh by every call to a provider and is never mutated
/// afterwards. It is either an IAM token (`ProviderType::OAuth`) or an HMAC key pair.
/// Secrets are zeroed on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(Arc<Inner>);

#[derive(Clone, PartialEq, Eq)]
struct Inner {
    token: Option<Token>,
    access_key_id: Zeroizing<String>,
    secret_access_key: Zeroizing<String>,
    session_token: Zeroizing<Option<String>>,
    service_instance_id: Option<String>,
    expiry: Option<SystemTime>,
    provider_name: &'static str,
    provider_type: ProviderType,
}

impl Credentials {
    /// HMAC credentials
    pub fn from_keys(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        provider_name: &'static str,
    ) -> Self {
        Credentials(Arc::new(Inner {
            token: None,
            access_key_id: Zeroizing::new(access_key_id.into()),
            secret_access_key: Zeroizing::new(secret_access_key.into()),
            session_token: Zeroizing::new(session_token),
            service_instance_id: None,
            expiry: None,
            provider_name,
            provider_type: ProviderType::Hmac,
        }))
    }

    /// IAM token credentials
    ///
    /// ```rust
    /// use cos_types::{Credentials, ProviderType, Token};
    /// use std::time::UNIX_EPOCH;
    /// let token = Token::new("access", "refresh", "Bearer", 3600, UNIX_EPOCH);
    /// let creds = Credentials::from_token(token, Some("instance".into()), "MyProvider");
    /// assert_eq!(creds.provider_type(), ProviderType::OAuth);
    /// ```
    pub fn from_token(
        token: Token,
        service_instance_id: Option<String>,
        provider_name: &'static str,
    ) -> Self {
        Credentials(Arc::new(Inner {
            token: Some(token),
            access_key_id: Zeroizing::new(String::new()),
            secret_access_key: Zeroizing::new(String::new()),
            session_token: Zeroizing::new(None),
            service_instance_id,
            expiry: None,
            provider_name,
            provider_type: ProviderType::OAuth,
        }))
    }

    /// Returns a copy of these credentials that expires at `expiry`
    pub fn with_expiry(&self, expiry: SystemTime) -> Self {
        let mut inner = self.0.as_ref().clone();
        inner.expiry = Some(expiry);
        Credentials(Arc::new(inner))
    }

    pub fn token(&self) -> Option<&Token> {
        self.0.token.as_ref()
    }

    pub fn access_key_id(&self) -> &str {
        &self.0.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.0.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.0.session_token.as_deref()
    }

    pub fn service_instance_id(&self) -> Option<&str> {
        self.0.service_instance_id.as_deref()
    }

    /// When these credentials stop being valid, if they expire at all
    ///
    /// Token credentials report the token expiration.
    pub fn expiry(&self) -> Option<SystemTime> {
        self.0
            .expiry
            .or_else(|| self.0.token.as_ref().map(Token::expiration_time))
    }

    pub fn provider_name(&self) -> &'static str {
        self.0.provider_name
    }

    pub fn provider_type(&self) -> ProviderType {
        self.0.provider_type
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut creds = f.debug_struct("Credentials");
        creds
            .field("provider_name", &self.0.provider_name)
            .field("provider_type", &self.0.provider_type);
        match &self.0.token {
            Some(token) => {
                creds.field("token", token);
            }
            None => {
                creds
                    .field("access_key_id", &self.0.access_key_id.as_str())
                    .field("secret_access_key", &"** redacted **");
            }
        }
        if let Some(id) = &self.0.service_instance_id {
            creds.field("service_instance_id", id);
        }
        creds.finish()
    }
}
