/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::{ApiKeySettings, TokenProvider};
use crate::provider_config::ProviderConfig;
use cos_auth::token_manager::{SharedTokenManager, TokenManagerFactory, TokenSource};
use cos_types::credential::provide_credentials::{future, ProvideCredentials};
use cos_types::credential::ProviderBuildError;

pub const STATIC_PROVIDER_NAME: &str = "StaticProviderNameIBM";

/// IAM credentials for an API key given in code
///
/// ```rust
/// use cos_auth_providers::ibm::StaticApiKeyProvider;
/// let provider = StaticApiKeyProvider::builder()
///     .api_key("my-api-key")
///     .service_instance_id("crn:v1:bluemix:public:cloud-object-storage:global:a/1::")
///     .build();
/// assert!(provider.is_valid());
/// ```
#[derive(Debug)]
pub struct StaticApiKeyProvider {
    inner: TokenProvider,
}

impl StaticApiKeyProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    pub fn build_error(&self) -> Option<&ProviderBuildError> {
        self.inner.build_error()
    }

    pub fn token_manager(&self) -> Option<&SharedTokenManager> {
        self.inner.token_manager()
    }
}

impl ProvideCredentials for StaticApiKeyProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.inner.credentials())
    }

    fn is_expired(&self) -> bool {
        self.inner.is_expired()
    }
}

/// Builder for [`StaticApiKeyProvider`]
#[derive(Debug, Default)]
pub struct Builder {
    settings: ApiKeySettings,
    config: Option<ProviderConfig>,
}

impl Builder {
    pub fn configure(mut self, config: &ProviderConfig) -> Self {
        self.config = Some(config.clone());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.settings.api_key = Some(api_key.into());
        self
    }

    pub fn service_instance_id(mut self, id: impl Into<String>) -> Self {
        self.settings.service_instance_id = Some(id.into());
        self
    }

    /// IAM token endpoint, defaults to the public IBM Cloud endpoint
    pub fn auth_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.settings.auth_endpoint = Some(endpoint.into());
        self
    }

    pub fn set_auth_endpoint(&mut self, endpoint: Option<String>) -> &mut Self {
        self.settings.auth_endpoint = endpoint;
        self
    }

    pub fn build(self) -> StaticApiKeyProvider {
        let config = self.config.unwrap_or_default();
        StaticApiKeyProvider {
            inner: build_api_key_provider(
                STATIC_PROVIDER_NAME,
                self.settings,
                &config,
                "static configuration",
            ),
        }
    }
}

/// Build the shared core of every API key provider
pub(crate) fn build_api_key_provider(
    name: &'static str,
    settings: ApiKeySettings,
    config: &ProviderConfig,
    source: &'static str,
) -> TokenProvider {
    let api_key = match settings.api_key.filter(|key| !key.is_empty()) {
        Some(api_key) => api_key,
        None => {
            return TokenProvider::invalid(
                name,
                ProviderBuildError::ApiKeyNotFound {
                    source: source.into(),
                },
            )
        }
    };
    let token_manager = config.token_manager_factory().token_manager(TokenSource::ApiKey {
        api_key,
        auth_endpoint: settings.auth_endpoint.filter(|endpoint| !endpoint.is_empty()),
    });
    tracing::debug!(provider = name, "built credentials provider");
    TokenProvider::ready(name, token_manager, settings.service_instance_id)
}
