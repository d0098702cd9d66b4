/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Configuration Options for Credential Providers

use cos_auth::token_manager::{DefaultTokenManagerFactory, SharedTokenManagerFactory};
use cos_hyper::{HyperClient, SharedHttpClient};
use cos_types::os_shim_internal::{Env, Fs};
use cos_types::time::SharedTimeSource;

/// Configuration options for Credential Providers
///
/// Every provider builder offers a `configure` method which applies these options. Providers
/// read the environment and the filesystem through `env` and `fs`, talk to IAM through the
/// HTTP client and create their token managers with the token manager factory.
///
/// When no factory is set, providers get a [`DefaultTokenManagerFactory`] built from the HTTP
/// client and the time source of this configuration.
///
/// # Example
/// ```rust
/// use cos_auth_providers::provider_config::ProviderConfig;
/// use cos_auth_providers::ibm::EnvironmentProvider;
/// let conf = ProviderConfig::default();
/// let provider = EnvironmentProvider::builder().configure(&conf).build();
/// ```
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    env: Env,
    fs: Fs,
    http: SharedHttpClient,
    time: SharedTimeSource,
    token_managers: Option<SharedTokenManagerFactory>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            env: Env::default(),
            fs: Fs::default(),
            http: SharedHttpClient::new(HyperClient::https()),
            time: SharedTimeSource::default(),
            token_managers: None,
        }
    }
}

impl ProviderConfig {
    pub fn env(&self) -> Env {
        self.env.clone()
    }

    pub fn fs(&self) -> Fs {
        self.fs.clone()
    }

    pub fn http_client(&self) -> SharedHttpClient {
        self.http.clone()
    }

    pub fn time_source(&self) -> SharedTimeSource {
        self.time.clone()
    }

    pub fn token_manager_factory(&self) -> SharedTokenManagerFactory {
        match &self.token_managers {
            Some(factory) => factory.clone(),
            None => SharedTokenManagerFactory::new(DefaultTokenManagerFactory::new(
                self.http.clone(),
                self.time.clone(),
            )),
        }
    }

    #[doc(hidden)]
    pub fn with_fs(self, fs: Fs) -> Self {
        ProviderConfig { fs, ..self }
    }

    #[doc(hidden)]
    pub fn with_env(self, env: Env) -> Self {
        ProviderConfig { env, ..self }
    }

    /// Override the HTTP client used for IAM token requests
    pub fn with_http_client(self, http: SharedHttpClient) -> Self {
        ProviderConfig { http, ..self }
    }

    pub fn with_time_source(self, time: SharedTimeSource) -> Self {
        ProviderConfig { time, ..self }
    }

    /// Override how providers create their token managers
    pub fn with_token_manager_factory(self, factory: SharedTokenManagerFactory) -> Self {
        ProviderConfig {
            token_managers: Some(factory),
            ..self
        }
    }
}
