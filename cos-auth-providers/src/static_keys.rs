/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! HMAC access keys known up front

use cos_types::credential::provide_credentials::{future, ProvideCredentials};
use cos_types::credential::CredentialsError;
use cos_types::Credentials;

pub const STATIC_PROVIDER_NAME: &str = "StaticProvider";

/// Keys read from `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`
pub const ENV_CONFIG_PROVIDER_NAME: &str = "EnvConfigCredentials";

/// Keys read from a profile of the shared files
pub const SHARED_CONFIG_PROVIDER_NAME: &str = "SharedConfigCredentials";

/// Provides the same HMAC credentials forever
///
/// Retrieval fails with `EmptyStaticCreds` when the access key or the secret is empty.
///
/// ```rust
/// use cos_auth_providers::static_keys::StaticKeyProvider;
/// let provider = StaticKeyProvider::new("AKID", "SECRET", None);
/// ```
#[derive(Clone, Debug)]
pub struct StaticKeyProvider {
    credentials: Credentials,
}

impl StaticKeyProvider {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self::named(
            access_key_id,
            secret_access_key,
            session_token,
            STATIC_PROVIDER_NAME,
        )
    }

    /// Static keys reported under `provider_name`
    pub fn named(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        provider_name: &'static str,
    ) -> Self {
        StaticKeyProvider {
            credentials: Credentials::from_keys(
                access_key_id,
                secret_access_key,
                session_token.filter(|token| !token.is_empty()),
                provider_name,
            ),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.credentials.provider_name()
    }

    fn credentials(&self) -> cos_types::credential::Result {
        if self.credentials.access_key_id().is_empty()
            || self.credentials.secret_access_key().is_empty()
        {
            return Err(CredentialsError::not_loaded(
                "EmptyStaticCreds",
                "static credentials are empty",
            ));
        }
        Ok(self.credentials.clone())
    }
}

impl ProvideCredentials for StaticKeyProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(self.credentials())
    }

    fn is_expired(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod test {
    use super::{StaticKeyProvider, ENV_CONFIG_PROVIDER_NAME, STATIC_PROVIDER_NAME};
    use cos_types::credential::ProvideCredentials;
    use cos_types::ProviderType;

    #[tokio::test]
    async fn provides_hmac_keys() {
        let provider = StaticKeyProvider::named(
            "AKID",
            "SECRET",
            Some("SESSION".into()),
            ENV_CONFIG_PROVIDER_NAME,
        );
        let creds = provider.provide_credentials().await.expect("keys set");
        assert_eq!(creds.access_key_id(), "AKID");
        assert_eq!(creds.secret_access_key(), "SECRET");
        assert_eq!(creds.session_token(), Some("SESSION"));
        assert_eq!(creds.provider_name(), ENV_CONFIG_PROVIDER_NAME);
        assert_eq!(creds.provider_type(), ProviderType::Hmac);
        assert!(!provider.is_expired());
    }

    #[tokio::test]
    async fn empty_keys_fail() {
        let provider = StaticKeyProvider::new("AKID", "", None);
        assert_eq!(provider.provider_name(), STATIC_PROVIDER_NAME);
        let err = provider.provide_credentials().await.expect_err("no secret");
        assert_eq!(err.code(), "EmptyStaticCreds");
    }
}
