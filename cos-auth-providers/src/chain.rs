/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use cos_types::credential::provide_credentials::{self, future, ProvideCredentials};
use cos_types::credential::CredentialsError;
use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::Instrument;

const NO_PROVIDER: usize = usize::MAX;

/// Credentials provider that checks a series of inner providers
///
/// Each provider will be checked in turn. The first provider that returns a successful credential
/// will be used, and the chain reports itself expired whenever that provider does.
///
/// When every provider fails the chain returns
/// [`NoValidProviders`](CredentialsError::NoValidProviders). With
/// [`verbose_errors`](ChainProvider::verbose_errors) the error lists the failure of every
/// provider.
///
/// ## Example
/// ```rust
/// use cos_auth_providers::chain::ChainProvider;
/// use cos_auth_providers::ibm::EnvironmentProvider;
/// use cos_types::Credentials;
/// let provider = ChainProvider::first_try("Environment", EnvironmentProvider::builder().build())
///     .or_else("Static", Credentials::from_keys("someacceskeyid", "somesecret", None, "Static"));
/// ```
#[derive(Debug)]
pub struct ChainProvider {
    providers: Vec<(Cow<'static, str>, Box<dyn ProvideCredentials>)>,
    verbose_errors: bool,
    current: AtomicUsize,
}

impl ChainProvider {
    pub fn first_try(
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        ChainProvider {
            providers: vec![(name.into(), Box::new(provider))],
            verbose_errors: false,
            current: AtomicUsize::new(NO_PROVIDER),
        }
    }

    pub fn or_else(
        mut self,
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        self.providers.push((name.into(), Box::new(provider)));
        self
    }

    /// Report every provider's error when the whole chain fails
    pub fn verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }

    async fn credentials(&self) -> provide_credentials::Result {
        let mut errors = Vec::new();
        for (index, (name, provider)) in self.providers.iter().enumerate() {
            let span = tracing::info_span!("load_credentials", provider = %name);
            match provider.provide_credentials().instrument(span).await {
                Ok(credentials) => {
                    tracing::info!(provider = %name, "loaded credentials");
                    self.current.store(index, Ordering::Release);
                    return Ok(credentials);
                }
                Err(e) => {
                    tracing::info!(provider = %name, error = %e, "provider in chain did not provide credentials");
                    if self.verbose_errors {
                        errors.push(e);
                    }
                }
            }
        }
        self.current.store(NO_PROVIDER, Ordering::Release);
        Err(CredentialsError::NoValidProviders { errors })
    }
}

impl ProvideCredentials for ChainProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }

    /// Expired when no provider has succeeded yet
    fn is_expired(&self) -> bool {
        match self.providers.get(self.current.load(Ordering::Acquire)) {
            Some((_, provider)) => provider.is_expired(),
            None => true,
        }
    }
}
