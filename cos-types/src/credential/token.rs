/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::convert::TryFrom;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use zeroize::Zeroizing;

/// IBM IAM bearer token
///
/// A token is issued by the IAM token service in exchange for an API key or a compute resource
/// token. `expiration` is authoritative: it is recorded when the token is created and never
/// recomputed from `expires_in`.
///
/// Tokens are immutable and cheap to clone. A refresh replaces the whole token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(Arc<Inner>);

#[derive(PartialEq, Eq)]
struct Inner {
    access_token: Zeroizing<String>,
    refresh_token: Zeroizing<String>,
    token_type: String,
    expires_in: i64,
    expiration: i64,
}

impl Token {
    /// Create a token issued at `issued_at` that lives for `expires_in` seconds
    ///
    /// ```rust
    /// use cos_types::Token;
    /// use std::time::{Duration, UNIX_EPOCH};
    /// let token = Token::new("access", "refresh", "Bearer", 3600, UNIX_EPOCH + Duration::from_secs(100));
    /// assert_eq!(token.expiration(), 3700);
    /// ```
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: i64,
        issued_at: SystemTime,
    ) -> Self {
        let expiration = unix_seconds(issued_at).saturating_add(expires_in);
        Self::from_parts(
            access_token,
            refresh_token,
            token_type,
            expires_in,
            expiration,
        )
    }

    /// Create a token from an explicit expiration timestamp (seconds since the unix epoch)
    pub fn from_parts(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: i64,
        expiration: i64,
    ) -> Self {
        Token(Arc::new(Inner {
            access_token: Zeroizing::new(access_token.into()),
            refresh_token: Zeroizing::new(refresh_token.into()),
            token_type: token_type.into(),
            expires_in,
            expiration,
        }))
    }

    pub fn access_token(&self) -> &str {
        &self.0.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.0.refresh_token
    }

    pub fn token_type(&self) -> &str {
        &self.0.token_type
    }

    /// Lifetime of the token in seconds, as reported by the issuer
    pub fn expires_in(&self) -> i64 {
        self.0.expires_in
    }

    /// Expiration in seconds since the unix epoch
    pub fn expiration(&self) -> i64 {
        self.0.expiration
    }

    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.0.expires_in).unwrap_or_default())
    }

    pub fn expiration_time(&self) -> SystemTime {
        match u64::try_from(self.0.expiration) {
            Ok(secs) => UNIX_EPOCH + Duration::from_secs(secs),
            Err(_) => UNIX_EPOCH,
        }
    }

    /// Value of the `Authorization` header for this token
    pub fn authorization(&self) -> String {
        let token_type = if self.0.token_type.is_empty() {
            "Bearer"
        } else {
            &self.0.token_type
        };
        format!("{} {}", token_type, self.access_token())
    }
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
        Err(before_epoch) => -i64::try_from(before_epoch.duration().as_secs()).unwrap_or(i64::MAX),
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"** redacted **")
            .field("refresh_token", &"** redacted **")
            .field("token_type", &self.0.token_type)
            .field("expires_in", &self.0.expires_in)
            .field("expiration", &self.0.expiration)
            .finish()
    }
}
