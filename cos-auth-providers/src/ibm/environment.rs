/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::static_api_key::build_api_key_provider;
use super::{ApiKeySettings, TokenProvider};
use crate::provider_config::ProviderConfig;
use cos_auth::token_manager::SharedTokenManager;
use cos_types::credential::provide_credentials::{future, ProvideCredentials};
use cos_types::credential::ProviderBuildError;
use cos_types::os_shim_internal::Env;

pub const ENV_PROVIDER_NAME: &str = "EnvProviderNameIBM";

const API_KEY_ID: &str = "IBM_API_KEY_ID";
const SERVICE_INSTANCE_ID: &str = "IBM_SERVICE_INSTANCE_ID";
const AUTH_ENDPOINT: &str = "IBM_AUTH_ENDPOINT";

/// IAM credentials for the API key in `IBM_API_KEY_ID`
///
/// `IBM_SERVICE_INSTANCE_ID` and `IBM_AUTH_ENDPOINT` are optional. The environment is read once,
/// when the provider is built.
#[derive(Debug)]
pub struct EnvironmentProvider {
    inner: TokenProvider,
}

impl EnvironmentProvider {
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

impl ProvideCredentials for EnvironmentProvider {
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

/// Builder for [`EnvironmentProvider`]
#[derive(Debug, Default)]
pub struct Builder {
    config: Option<ProviderConfig>,
}

impl Builder {
    pub fn configure(mut self, config: &ProviderConfig) -> Self {
        self.config = Some(config.clone());
        self
    }

    pub fn build(self) -> EnvironmentProvider {
        let config = self.config.unwrap_or_default();
        let settings = settings_from(&config.env());
        EnvironmentProvider {
            inner: build_api_key_provider(ENV_PROVIDER_NAME, settings, &config, API_KEY_ID),
        }
    }
}

fn settings_from(env: &Env) -> ApiKeySettings {
    let var = |key: &str| env.get(key).ok().filter(|value| !value.is_empty());
    ApiKeySettings {
        api_key: var(API_KEY_ID),
        service_instance_id: var(SERVICE_INSTANCE_ID),
        auth_endpoint: var(AUTH_ENDPOINT),
    }
}

#[cfg(test)]
mod test {
    use super::{EnvironmentProvider, ENV_PROVIDER_NAME};
    use crate::ibm::test_util::{Recorded, RecordingFactory};
    use crate::provider_config::ProviderConfig;
    use cos_auth::token_manager::SharedTokenManagerFactory;
    use cos_types::credential::ProvideCredentials;
    use cos_types::os_shim_internal::Env;
    use cos_types::ProviderType;
    use tracing_test::traced_test;

    fn config(env: &[(&str, &str)], factory: &RecordingFactory) -> ProviderConfig {
        ProviderConfig::default()
            .with_env(Env::from_slice(env))
            .with_token_manager_factory(SharedTokenManagerFactory::new(factory.clone()))
    }

    #[tokio::test]
    async fn reads_every_ibm_variable() {
        let factory = RecordingFactory::default();
        let provider = EnvironmentProvider::builder()
            .configure(&config(
                &[
                    ("IBM_API_KEY_ID", "apikey"),
                    ("IBM_SERVICE_INSTANCE_ID", "instance"),
                    ("IBM_AUTH_ENDPOINT", "https://iam.example.com/token"),
                ],
                &factory,
            ))
            .build();
        assert!(provider.is_valid());
        assert_eq!(
            factory.recorded(),
            vec![Recorded::ApiKey {
                api_key: "apikey".into(),
                auth_endpoint: Some("https://iam.example.com/token".into()),
            }]
        );
        let creds = provider.provide_credentials().await.expect("valid");
        assert_eq!(creds.provider_name(), ENV_PROVIDER_NAME);
        assert_eq!(creds.provider_type(), ProviderType::OAuth);
        assert_eq!(creds.service_instance_id(), Some("instance"));
    }

    #[tokio::test]
    async fn endpoint_and_instance_are_optional() {
        let factory = RecordingFactory::default();
        let provider = EnvironmentProvider::builder()
            .configure(&config(&[("IBM_API_KEY_ID", "apikey")], &factory))
            .build();
        assert_eq!(
            factory.recorded(),
            vec![Recorded::ApiKey {
                api_key: "apikey".into(),
                auth_endpoint: None,
            }]
        );
        let creds = provider.provide_credentials().await.expect("valid");
        assert_eq!(creds.service_instance_id(), None);
    }

    #[traced_test]
    #[tokio::test]
    async fn missing_api_key_invalidates_provider() {
        let factory = RecordingFactory::default();
        let provider = EnvironmentProvider::builder()
            .configure(&config(&[("IBM_API_KEY_ID", "")], &factory))
            .build();
        assert!(!provider.is_valid());
        assert_eq!(
            provider.build_error().map(|err| err.code()),
            Some("IbmApiKeyIdNotFound")
        );
        let err = provider.provide_credentials().await.expect_err("invalid");
        assert!(err.to_string().contains("IBM_API_KEY_ID"));
        assert!(logs_contain("credentials provider is not valid"));
    }
}
