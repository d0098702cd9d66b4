/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::invalid_provider;
use crate::provider_config::ProviderConfig;
use cos_auth::iam::{ContainerTokenIssuer, IssueToken};
use cos_types::credential::provide_credentials::{self, future, ProvideCredentials};
use cos_types::credential::{CredentialsError, ProviderBuildError};
use cos_types::Credentials;
use std::path::PathBuf;

pub const TRUSTED_PROFILE_PROVIDER_NAME: &str = "TrustedProfileProviderNameIBM";

/// IAM credentials for a trusted profile, authenticated with a compute resource token
///
/// Every retrieval reads the CR token file and exchanges it for a new IAM token: the provider
/// keeps no token between retrievals and always reports itself expired.
///
/// ```rust
/// use cos_auth_providers::ibm::TrustedProfileProvider;
/// let provider = TrustedProfileProvider::builder()
///     .cr_token_file("/var/run/secrets/tokens/vault-token")
///     .profile_name("my-trusted-profile")
///     .build();
/// assert!(provider.is_valid());
/// ```
#[derive(Debug)]
pub struct TrustedProfileProvider {
    state: Result<ContainerTokenIssuer, ProviderBuildError>,
    service_instance_id: Option<String>,
}

impl TrustedProfileProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn is_valid(&self) -> bool {
        self.state.is_ok()
    }

    pub fn build_error(&self) -> Option<&ProviderBuildError> {
        self.state.as_ref().err()
    }

    async fn credentials(&self) -> provide_credentials::Result {
        let issuer = self
            .state
            .as_ref()
            .map_err(|err| invalid_provider(TRUSTED_PROFILE_PROVIDER_NAME, err))?;
        let token = issuer.issue_token().await.map_err(|err| {
            tracing::debug!(provider = TRUSTED_PROFILE_PROVIDER_NAME, error = %err, "failed to retrieve token");
            CredentialsError::TokenRetrieve {
                provider_name: TRUSTED_PROFILE_PROVIDER_NAME,
                source: err.into(),
            }
        })?;
        Ok(Credentials::from_token(
            token,
            self.service_instance_id.clone(),
            TRUSTED_PROFILE_PROVIDER_NAME,
        ))
    }
}

impl ProvideCredentials for TrustedProfileProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }

    fn is_expired(&self) -> bool {
        true
    }
}

/// Builder for [`TrustedProfileProvider`]
///
/// A CR token file and at least one of the trusted profile name and ID are required.
#[derive(Debug, Default)]
pub struct Builder {
    config: Option<ProviderConfig>,
    cr_token_file: Option<PathBuf>,
    profile_name: Option<String>,
    profile_id: Option<String>,
    auth_endpoint: Option<String>,
    service_instance_id: Option<String>,
}

impl Builder {
    pub fn configure(mut self, config: &ProviderConfig) -> Self {
        self.config = Some(config.clone());
        self
    }

    pub fn cr_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cr_token_file = Some(path.into());
        self
    }

    pub fn profile_name(mut self, name: impl Into<String>) -> Self {
        self.profile_name = Some(name.into());
        self
    }

    pub fn profile_id(mut self, id: impl Into<String>) -> Self {
        self.profile_id = Some(id.into());
        self
    }

    pub fn auth_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.auth_endpoint = Some(endpoint.into());
        self
    }

    pub fn service_instance_id(mut self, id: impl Into<String>) -> Self {
        self.service_instance_id = Some(id.into());
        self
    }

    pub fn build(self) -> TrustedProfileProvider {
        let config = self.config.unwrap_or_default();
        let non_empty = |value: Option<String>| value.filter(|value| !value.is_empty());
        let cr_token_file = self
            .cr_token_file
            .filter(|path| !path.as_os_str().is_empty());
        let profile_name = non_empty(self.profile_name);
        let profile_id = non_empty(self.profile_id);
        let state = match (cr_token_file, profile_name, profile_id) {
            (None, _, _) => Err(ProviderBuildError::CrTokenFilePathNotFound),
            (Some(_), None, None) => Err(ProviderBuildError::TrustedProfileNotFound),
            (Some(path), name, id) => {
                let mut issuer = ContainerTokenIssuer::builder()
                    .cr_token_file(path)
                    .endpoint(self.auth_endpoint.as_deref())
                    .fs(config.fs())
                    .http_client(config.http_client())
                    .time_source(config.time_source());
                if let Some(name) = name {
                    issuer = issuer.profile_name(name);
                }
                if let Some(id) = id {
                    issuer = issuer.profile_id(id);
                }
                Ok(issuer.build())
            }
        };
        if let Err(err) = &state {
            tracing::debug!(provider = TRUSTED_PROFILE_PROVIDER_NAME, error = %err, "credentials provider is not valid");
        }
        TrustedProfileProvider {
            state,
            service_instance_id: non_empty(self.service_instance_id),
        }
    }
}
