/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::static_api_key::build_api_key_provider;
use super::{keys, ApiKeySettings, TokenProvider};
use crate::provider_config::ProviderConfig;
use cos_auth::token_manager::SharedTokenManager;
use cos_types::credential::provide_credentials::{future, ProvideCredentials};
use cos_types::credential::ProviderBuildError;
use cos_types::profile::{self, ProfileFile, ProfileFileKind};
use std::path::PathBuf;

pub const SHARED_CREDENTIALS_PROVIDER_NAME: &str = "SharedCredentialsProviderNameIBM";
pub const SHARED_CONFIG_PROVIDER_NAME: &str = "SharedConfigProviderNameIBM";

/// IAM credentials for the API key in a profile of the shared credentials file
///
/// The file is `~/.aws/credentials` unless `AWS_SHARED_CREDENTIALS_FILE` or
/// [`SharedCredentialsFileBuilder::file`] says otherwise. The profile is `AWS_PROFILE`, or
/// `default`, unless set with [`SharedCredentialsFileBuilder::profile_name`]. Profiles are
/// written `[name]`.
///
/// The provider is invalid when the file or the profile does not exist, or the profile has no
/// `ibm_api_key_id`.
#[derive(Debug)]
pub struct SharedCredentialsFileProvider {
    inner: TokenProvider,
}

/// IAM credentials for the API key in a profile of the shared config file
///
/// Identical to [`SharedCredentialsFileProvider`] except that the file is `~/.aws/config`
/// (`AWS_CONFIG_FILE`) and profiles are written `[profile name]`.
#[derive(Debug)]
pub struct SharedConfigFileProvider {
    inner: TokenProvider,
}

macro_rules! shared_file_provider {
    ($provider:ident, $builder:ident, $name:expr, $kind:expr) => {
        impl $provider {
            pub fn builder() -> $builder {
                $builder::default()
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

        impl ProvideCredentials for $provider {
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

        #[doc = concat!("Builder for [`", stringify!($provider), "`]")]
        #[derive(Debug, Default)]
        pub struct $builder {
            config: Option<ProviderConfig>,
            file: Option<PathBuf>,
            profile_name: Option<String>,
        }

        impl $builder {
            pub fn configure(mut self, config: &ProviderConfig) -> Self {
                self.config = Some(config.clone());
                self
            }

            /// Read this file instead of the default one
            pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
                self.file = Some(path.into());
                self
            }

            /// Use this profile instead of `AWS_PROFILE` or `default`
            pub fn profile_name(mut self, name: impl Into<String>) -> Self {
                self.profile_name = Some(name.into());
                self
            }

            pub fn set_profile_name(&mut self, name: Option<String>) -> &mut Self {
                self.profile_name = name;
                self
            }

            pub fn build(self) -> $provider {
                let config = self.config.unwrap_or_default();
                $provider {
                    inner: build_from_file(
                        $name,
                        $kind,
                        &config,
                        self.file,
                        self.profile_name.as_deref(),
                    ),
                }
            }
        }
    };
}

shared_file_provider!(
    SharedCredentialsFileProvider,
    SharedCredentialsFileBuilder,
    SHARED_CREDENTIALS_PROVIDER_NAME,
    ProfileFileKind::Credentials
);
shared_file_provider!(
    SharedConfigFileProvider,
    SharedConfigFileBuilder,
    SHARED_CONFIG_PROVIDER_NAME,
    ProfileFileKind::Config
);

fn build_from_file(
    name: &'static str,
    kind: ProfileFileKind,
    config: &ProviderConfig,
    path: Option<PathBuf>,
    profile_name: Option<&str>,
) -> TokenProvider {
    let file = match path {
        Some(path) => ProfileFile::FilePath { kind, path },
        None => ProfileFile::Default(kind),
    };
    match load_settings(config, &file, profile_name) {
        Ok(settings) => build_api_key_provider(name, settings, config, source_name(kind)),
        Err(err) => TokenProvider::invalid(name, err),
    }
}

fn source_name(kind: ProfileFileKind) -> &'static str {
    match kind {
        ProfileFileKind::Credentials => "the shared credentials file",
        ProfileFileKind::Config => "the shared config file",
    }
}

fn load_settings(
    config: &ProviderConfig,
    file: &ProfileFile,
    profile_name: Option<&str>,
) -> Result<ApiKeySettings, ProviderBuildError> {
    let profiles = profile::load_required(&config.fs(), &config.env(), file, profile_name)
        .map_err(|err| ProviderBuildError::SharedFileLoad {
            message: err.to_string(),
        })?;
    let selected = profiles.selected_profile();
    let profile = profiles
        .get_profile(selected)
        .ok_or_else(|| ProviderBuildError::SharedFileLoad {
            message: format!("failed to load profile, {}.", selected),
        })?;
    let value = |key: &str| profile.get_non_empty(key).map(str::to_string);
    Ok(ApiKeySettings {
        api_key: value(keys::API_KEY_ID),
        service_instance_id: value(keys::SERVICE_INSTANCE_ID),
        auth_endpoint: value(keys::AUTH_ENDPOINT),
    })
}

#[cfg(test)]
mod test {
    use super::{
        SharedConfigFileProvider, SharedCredentialsFileProvider, SHARED_CONFIG_PROVIDER_NAME,
        SHARED_CREDENTIALS_PROVIDER_NAME,
    };
    use crate::ibm::test_util::{Recorded, RecordingFactory};
    use crate::provider_config::ProviderConfig;
    use cos_auth::token_manager::SharedTokenManagerFactory;
    use cos_types::credential::ProvideCredentials;
    use cos_types::os_shim_internal::{Env, Fs};
    use cos_types::ProviderType;

    const PROFILES: &str = "\
[default]
ibm_api_key_id = apikey
ibm_service_instance_id = instance
ibm_auth_endpoint = https://iam.example.com/token

[shcred1]
ibm_api_key_id = apikeyCRED
ibm_service_instance_id = instanceCRED
ibm_auth_endpoint = https://iam.example.com/tokenCRED

[profile shconf1]
ibm_api_key_id = apikeyCONF
ibm_service_instance_id = instanceCONF
ibm_auth_endpoint = https://iam.example.com/tokenCONF
";

    fn config(env: &[(&str, &str)], factory: &RecordingFactory) -> ProviderConfig {
        ProviderConfig::default()
            .with_env(Env::from_slice(env))
            .with_fs(Fs::from_slice(&[
                ("/home/.aws/credentials", PROFILES),
                ("/home/.aws/config", PROFILES),
            ]))
            .with_token_manager_factory(SharedTokenManagerFactory::new(factory.clone()))
    }

    fn api_key(key: &str, endpoint: &str) -> Recorded {
        Recorded::ApiKey {
            api_key: key.into(),
            auth_endpoint: Some(endpoint.into()),
        }
    }

    #[tokio::test]
    async fn default_profile_of_the_credentials_file() {
        let factory = RecordingFactory::default();
        let provider = SharedCredentialsFileProvider::builder()
            .configure(&config(&[("HOME", "/home")], &factory))
            .build();
        assert!(provider.is_valid());
        assert_eq!(
            factory.recorded(),
            vec![api_key("apikey", "https://iam.example.com/token")]
        );
        let creds = provider.provide_credentials().await.expect("valid");
        assert_eq!(creds.provider_name(), SHARED_CREDENTIALS_PROVIDER_NAME);
        assert_eq!(creds.provider_type(), ProviderType::OAuth);
        assert_eq!(creds.service_instance_id(), Some("instance"));
    }

    #[tokio::test]
    async fn named_credentials_profile_does_not_leak_default_values() {
        let factory = RecordingFactory::default();
        let provider = SharedCredentialsFileProvider::builder()
            .profile_name("shcred1")
            .configure(&config(&[("HOME", "/home")], &factory))
            .build();
        assert_eq!(
            factory.recorded(),
            vec![api_key("apikeyCRED", "https://iam.example.com/tokenCRED")]
        );
        let creds = provider.provide_credentials().await.expect("valid");
        assert_eq!(creds.service_instance_id(), Some("instanceCRED"));
    }

    #[tokio::test]
    async fn config_file_profiles_need_the_profile_prefix() {
        let factory = RecordingFactory::default();
        let provider = SharedConfigFileProvider::builder()
            .profile_name("shconf1")
            .configure(&config(&[("HOME", "/home")], &factory))
            .build();
        assert_eq!(
            factory.recorded(),
            vec![api_key("apikeyCONF", "https://iam.example.com/tokenCONF")]
        );
        let creds = provider.provide_credentials().await.expect("valid");
        assert_eq!(creds.provider_name(), SHARED_CONFIG_PROVIDER_NAME);
        assert_eq!(creds.service_instance_id(), Some("instanceCONF"));

        // `[shcred1]` has no `profile ` prefix, so the config file does not define it
        let provider = SharedConfigFileProvider::builder()
            .profile_name("shcred1")
            .configure(&config(&[("HOME", "/home")], &factory))
            .build();
        assert_eq!(
            provider.build_error().map(|err| err.code()),
            Some("SharedCredsLoad")
        );
    }

    #[tokio::test]
    async fn profile_comes_from_the_environment() {
        let factory = RecordingFactory::default();
        let provider = SharedCredentialsFileProvider::builder()
            .configure(&config(
                &[("HOME", "/home"), ("AWS_PROFILE", "shcred1")],
                &factory,
            ))
            .build();
        let creds = provider.provide_credentials().await.expect("valid");
        assert_eq!(creds.service_instance_id(), Some("instanceCRED"));
    }

    #[tokio::test]
    async fn missing_file_invalidates_provider() {
        let factory = RecordingFactory::default();
        let provider = SharedCredentialsFileProvider::builder()
            .configure(&config(&[("HOME", "/nobody")], &factory))
            .build();
        assert!(!provider.is_valid());
        let err = provider.provide_credentials().await.expect_err("invalid");
        assert_eq!(err.code(), "SharedCredsLoad");
        assert!(factory.recorded().is_empty());
    }

    #[tokio::test]
    async fn profile_without_api_key_invalidates_provider() {
        let factory = RecordingFactory::default();
        let conf = ProviderConfig::default()
            .with_fs(Fs::from_slice(&[(
                "/creds",
                "[default]\naws_access_key_id = AKID\n",
            )]))
            .with_env(Env::from_slice(&[]))
            .with_token_manager_factory(SharedTokenManagerFactory::new(factory.clone()));
        let provider = SharedCredentialsFileProvider::builder()
            .file("/creds")
            .configure(&conf)
            .build();
        assert_eq!(
            provider.build_error().map(|err| err.code()),
            Some("IbmApiKeyIdNotFound")
        );
    }
}
