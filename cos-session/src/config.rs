/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Client configuration shared by every service client of a session

use cos_auth::CredentialsCache;
use cos_endpoint::SharedEndpointResolver;
use cos_hyper::SharedHttpClient;
use cos_types::Region;

/// Configuration of a session and of the clients created from it
///
/// Every field is optional. [`merge_in`](Config::merge_in) overlays the fields another config
/// sets, which is how explicit settings take precedence over the environment and the shared
/// files. Cloning is shallow: the credentials cache, the HTTP client and the endpoint resolver
/// are shared between clones.
///
/// ```rust
/// use cos_session::Config;
/// use cos_types::Region;
/// let config = Config::builder()
///     .region(Region::new("us-south"))
///     .disable_ssl(true)
///     .build();
/// assert_eq!(config.region(), Some(&Region::new("us-south")));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Config {
    region: Option<Region>,
    credentials: Option<CredentialsCache>,
    endpoint: Option<String>,
    endpoint_resolver: Option<SharedEndpointResolver>,
    http_client: Option<SharedHttpClient>,
    max_retries: Option<u32>,
    disable_ssl: Option<bool>,
    use_dual_stack: Option<bool>,
    disable_param_validation: Option<bool>,
    credentials_chain_verbose_errors: Option<bool>,
}

macro_rules! merge_fields {
    ($target:ident, $other:ident, $($field:ident),+) => {
        $(
            if $other.$field.is_some() {
                $target.$field = $other.$field.clone();
            }
        )+
    };
}

impl Config {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Overwrite every field of `self` that `other` sets
    pub fn merge_in(&mut self, other: &Config) {
        merge_fields!(
            self,
            other,
            region,
            credentials,
            endpoint,
            endpoint_resolver,
            http_client,
            max_retries,
            disable_ssl,
            use_dual_stack,
            disable_param_validation,
            credentials_chain_verbose_errors
        );
    }

    /// A copy of `self` with every config of `overrides` merged in, in order
    pub fn copy(&self, overrides: &[Config]) -> Config {
        let mut config = self.clone();
        for other in overrides {
            config.merge_in(other);
        }
        config
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    pub fn credentials(&self) -> Option<&CredentialsCache> {
        self.credentials.as_ref()
    }

    /// Endpoint that overrides endpoint resolution
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn endpoint_resolver(&self) -> Option<&SharedEndpointResolver> {
        self.endpoint_resolver.as_ref()
    }

    pub fn http_client(&self) -> Option<&SharedHttpClient> {
        self.http_client.as_ref()
    }

    /// `None` leaves the retry count to the service client
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    pub fn disable_ssl(&self) -> bool {
        self.disable_ssl.unwrap_or_default()
    }

    pub fn use_dual_stack(&self) -> bool {
        self.use_dual_stack.unwrap_or_default()
    }

    pub fn disable_param_validation(&self) -> bool {
        self.disable_param_validation.unwrap_or_default()
    }

    /// Report every provider's error when the fallback credentials chain fails
    pub fn credentials_chain_verbose_errors(&self) -> bool {
        self.credentials_chain_verbose_errors.unwrap_or_default()
    }

    pub(crate) fn set_region_if_unset(&mut self, region: Option<Region>) {
        if self.region.is_none() {
            self.region = region;
        }
    }

    pub(crate) fn set_credentials(&mut self, credentials: CredentialsCache) {
        self.credentials = Some(credentials);
    }

    pub(crate) fn set_endpoint_resolver_if_unset(&mut self, resolver: SharedEndpointResolver) {
        if self.endpoint_resolver.is_none() {
            self.endpoint_resolver = Some(resolver);
        }
    }

    pub(crate) fn set_http_client(&mut self, http_client: SharedHttpClient) {
        self.http_client = Some(http_client);
    }
}

/// Builder for [`Config`]
#[derive(Debug, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn region(mut self, region: impl Into<Option<Region>>) -> Self {
        self.set_region(region);
        self
    }

    pub fn set_region(&mut self, region: impl Into<Option<Region>>) -> &mut Self {
        self.config.region = region.into().filter(|region| !region.as_ref().is_empty());
        self
    }

    /// Credentials used instead of the ones the session would resolve
    pub fn credentials(mut self, credentials: CredentialsCache) -> Self {
        self.set_credentials(Some(credentials));
        self
    }

    pub fn set_credentials(&mut self, credentials: Option<CredentialsCache>) -> &mut Self {
        self.config.credentials = credentials;
        self
    }

    /// Send requests to this endpoint instead of resolving one
    ///
    /// `https://` (or `http://` with [`disable_ssl`](Builder::disable_ssl)) is added when the
    /// endpoint has no scheme.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.set_endpoint(Some(endpoint.into()));
        self
    }

    pub fn set_endpoint(&mut self, endpoint: Option<String>) -> &mut Self {
        self.config.endpoint = endpoint.filter(|endpoint| !endpoint.is_empty());
        self
    }

    pub fn endpoint_resolver(mut self, resolver: SharedEndpointResolver) -> Self {
        self.config.endpoint_resolver = Some(resolver);
        self
    }

    pub fn http_client(mut self, http_client: SharedHttpClient) -> Self {
        self.config.http_client = Some(http_client);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = Some(max_retries);
        self
    }

    pub fn disable_ssl(mut self, disable_ssl: bool) -> Self {
        self.config.disable_ssl = Some(disable_ssl);
        self
    }

    pub fn use_dual_stack(mut self, use_dual_stack: bool) -> Self {
        self.config.use_dual_stack = Some(use_dual_stack);
        self
    }

    pub fn disable_param_validation(mut self, disable: bool) -> Self {
        self.config.disable_param_validation = Some(disable);
        self
    }

    pub fn credentials_chain_verbose_errors(mut self, verbose: bool) -> Self {
        self.config.credentials_chain_verbose_errors = Some(verbose);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
