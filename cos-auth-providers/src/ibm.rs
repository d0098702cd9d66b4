/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! IBM IAM credentials providers
//!
//! Every provider in this module produces [`ProviderType::OAuth`](cos_types::ProviderType)
//! credentials carrying an IAM bearer token. Validity is decided once, when the provider is
//! built: an invalid provider reports the same [`ProviderBuildError`] from every retrieval and
//! never recovers.
//!
//! | Provider | Name |
//! |---|---|
//! | [`StaticApiKeyProvider`] | `StaticProviderNameIBM` |
//! | [`EnvironmentProvider`] | `EnvProviderNameIBM` |
//! | [`SharedCredentialsFileProvider`] | `SharedCredentialsProviderNameIBM` |
//! | [`SharedConfigFileProvider`] | `SharedConfigProviderNameIBM` |
//! | [`TrustedProfileProvider`] | `TrustedProfileProviderNameIBM` |
//! | [`CustomInitFuncProvider`] | `CustomInitFuncProviderNameIBM` |

use cos_auth::token_manager::{ManageToken, SharedTokenManager};
use cos_types::credential::{provide_credentials, CredentialsError, ProviderBuildError};
use cos_types::Credentials;

pub mod custom_init;
pub mod environment;
pub mod shared_file;
pub mod static_api_key;
pub mod trusted_profile;

pub use custom_init::{CustomInitFuncProvider, CUSTOM_INIT_FUNC_PROVIDER_NAME};
pub use environment::{EnvironmentProvider, ENV_PROVIDER_NAME};
pub use shared_file::{
    SharedConfigFileBuilder, SharedConfigFileProvider, SharedCredentialsFileBuilder,
    SharedCredentialsFileProvider, SHARED_CONFIG_PROVIDER_NAME, SHARED_CREDENTIALS_PROVIDER_NAME,
};
pub use static_api_key::{StaticApiKeyProvider, STATIC_PROVIDER_NAME};
pub use trusted_profile::{TrustedProfileProvider, TRUSTED_PROFILE_PROVIDER_NAME};

/// Profile and environment keys shared by the API key providers
pub(crate) mod keys {
    pub const API_KEY_ID: &str = "ibm_api_key_id";
    pub const SERVICE_INSTANCE_ID: &str = "ibm_service_instance_id";
    pub const AUTH_ENDPOINT: &str = "ibm_auth_endpoint";
}

/// Token-manager backed core of the API key and custom init function providers
#[derive(Debug)]
pub(crate) struct TokenProvider {
    name: &'static str,
    state: Result<Ready, ProviderBuildError>,
}

#[derive(Debug)]
struct Ready {
    token_manager: SharedTokenManager,
    service_instance_id: Option<String>,
}

impl TokenProvider {
    pub(crate) fn ready(
        name: &'static str,
        token_manager: SharedTokenManager,
        service_instance_id: Option<String>,
    ) -> Self {
        TokenProvider {
            name,
            state: Ok(Ready {
                token_manager,
                service_instance_id: service_instance_id.filter(|id| !id.is_empty()),
            }),
        }
    }

    pub(crate) fn invalid(name: &'static str, error: ProviderBuildError) -> Self {
        tracing::debug!(provider = name, error = %error, "credentials provider is not valid");
        TokenProvider {
            name,
            state: Err(error),
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.state.is_ok()
    }

    pub(crate) fn build_error(&self) -> Option<&ProviderBuildError> {
        self.state.as_ref().err()
    }

    pub(crate) fn token_manager(&self) -> Option<&SharedTokenManager> {
        self.state.as_ref().ok().map(|ready| &ready.token_manager)
    }

    pub(crate) async fn credentials(&self) -> provide_credentials::Result {
        let ready = self
            .state
            .as_ref()
            .map_err(|error| invalid_provider(self.name, error))?;
        let token = ready.token_manager.get().await.map_err(|err| {
            tracing::debug!(provider = self.name, error = %err, "failed to retrieve token");
            CredentialsError::TokenRetrieve {
                provider_name: self.name,
                source: err.into(),
            }
        })?;
        Ok(Credentials::from_token(
            token,
            ready.service_instance_id.clone(),
            self.name,
        ))
    }

    /// Always expired
    ///
    /// The token manager owns the cached token, so every lookup has to reach it for advisory
    /// refreshes to start and for a refreshed token to replace the one handed out before.
    pub(crate) fn is_expired(&self) -> bool {
        true
    }
}

pub(crate) fn invalid_provider(name: &'static str, error: &ProviderBuildError) -> CredentialsError {
    CredentialsError::InvalidProvider {
        provider_name: name,
        error: error.clone(),
    }
}

/// Values of the IBM keys in one profile or environment
#[derive(Debug, Default)]
pub(crate) struct ApiKeySettings {
    pub(crate) api_key: Option<String>,
    pub(crate) service_instance_id: Option<String>,
    pub(crate) auth_endpoint: Option<String>,
}

#[cfg(test)]
pub(crate) mod test_util {
    use cos_auth::token_manager::{
        ManageToken, SharedTokenManager, TokenManagerFactory, TokenSource,
    };
    use cos_auth::TokenError;
    use cos_types::Token;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::UNIX_EPOCH;

    /// What a [`RecordingFactory`] was asked to build
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(crate) enum Recorded {
        ApiKey {
            api_key: String,
            auth_endpoint: Option<String>,
        },
        Issuer,
    }

    /// Token manager factory that records every token source and hands out fake managers
    #[derive(Clone, Debug, Default)]
    pub(crate) struct RecordingFactory {
        recorded: Arc<Mutex<Vec<Recorded>>>,
        failing: Arc<AtomicBool>,
    }

    impl RecordingFactory {
        pub(crate) fn recorded(&self) -> Vec<Recorded> {
            self.recorded.lock().unwrap().clone()
        }

        pub(crate) fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl TokenManagerFactory for RecordingFactory {
        fn token_manager(&self, source: TokenSource) -> SharedTokenManager {
            let recorded = match source {
                TokenSource::ApiKey {
                    api_key,
                    auth_endpoint,
                } => Recorded::ApiKey {
                    api_key,
                    auth_endpoint,
                },
                _ => Recorded::Issuer,
            };
            self.recorded.lock().unwrap().push(recorded);
            SharedTokenManager::new(FakeTokenManager(self.clone()))
        }
    }

    #[derive(Debug)]
    struct FakeTokenManager(RecordingFactory);

    #[async_trait::async_trait]
    impl ManageToken for FakeTokenManager {
        async fn get(&self) -> Result<Token, TokenError> {
            if self.0.failing.load(Ordering::SeqCst) {
                return Err(TokenError::Service {
                    status: 400,
                    message: "bad api key".into(),
                });
            }
            Ok(Token::new("access", "refresh", "Bearer", 3600, UNIX_EPOCH))
        }

        async fn refresh(&self) -> Result<Token, TokenError> {
            self.get().await
        }

        fn is_expired(&self) -> bool {
            false
        }

        fn start_background_refresh(&self) {}

        fn stop_background_refresh(&self) {}
    }
}
