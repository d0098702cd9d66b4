/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::TokenProvider;
use crate::provider_config::ProviderConfig;
use cos_auth::iam::{issue_token_fn, IssueToken, SharedTokenIssuer};
use cos_auth::token_manager::{SharedTokenManager, TokenManagerFactory, TokenSource};
use cos_auth::TokenError;
use cos_types::credential::provide_credentials::{future, ProvideCredentials};
use cos_types::credential::ProviderBuildError;
use cos_types::Token;
use std::future::Future;

pub const CUSTOM_INIT_FUNC_PROVIDER_NAME: &str = "CustomInitFuncProviderNameIBM";

/// IAM credentials for tokens issued by caller code
///
/// The tokens returned by the init function are managed like any other IAM token: cached,
/// refreshed before they expire and shared by concurrent callers.
///
/// ```rust
/// use cos_auth_providers::ibm::CustomInitFuncProvider;
/// use cos_types::Token;
/// use std::time::SystemTime;
/// let provider = CustomInitFuncProvider::builder(|| async {
///     Ok(Token::new("access", "refresh", "Bearer", 3600, SystemTime::now()))
/// })
/// .service_instance_id("instance")
/// .build();
/// ```
#[derive(Debug)]
pub struct CustomInitFuncProvider {
    inner: TokenProvider,
}

impl CustomInitFuncProvider {
    /// Issue tokens with an async closure
    pub fn builder<F, Fut>(init: F) -> Builder
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Token, TokenError>> + Send + 'static,
    {
        Self::builder_with_issuer(issue_token_fn(init))
    }

    /// Issue tokens with any [`IssueToken`] implementation
    pub fn builder_with_issuer(issuer: impl IssueToken + 'static) -> Builder {
        Builder {
            config: None,
            issuer: SharedTokenIssuer::new(issuer),
            service_instance_id: None,
        }
    }

    /// Always `true`: a caller-supplied issuer needs no configuration
    pub fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    /// Always `None`, see [`is_valid`](CustomInitFuncProvider::is_valid)
    pub fn build_error(&self) -> Option<&ProviderBuildError> {
        self.inner.build_error()
    }

    pub fn token_manager(&self) -> Option<&SharedTokenManager> {
        self.inner.token_manager()
    }
}

impl ProvideCredentials for CustomInitFuncProvider {
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

/// Builder for [`CustomInitFuncProvider`]
#[derive(Debug)]
pub struct Builder {
    config: Option<ProviderConfig>,
    issuer: SharedTokenIssuer,
    service_instance_id: Option<String>,
}

impl Builder {
    pub fn configure(mut self, config: &ProviderConfig) -> Self {
        self.config = Some(config.clone());
        self
    }

    pub fn service_instance_id(mut self, id: impl Into<String>) -> Self {
        self.service_instance_id = Some(id.into());
        self
    }

    pub fn build(self) -> CustomInitFuncProvider {
        let config = self.config.unwrap_or_default();
        let token_manager = config
            .token_manager_factory()
            .token_manager(TokenSource::Issuer(self.issuer));
        CustomInitFuncProvider {
            inner: TokenProvider::ready(
                CUSTOM_INIT_FUNC_PROVIDER_NAME,
                token_manager,
                self.service_instance_id,
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{CustomInitFuncProvider, CUSTOM_INIT_FUNC_PROVIDER_NAME};
    use crate::ibm::test_util::{Recorded, RecordingFactory};
    use crate::provider_config::ProviderConfig;
    use cos_auth::token_manager::{ManageToken, SharedTokenManagerFactory};
    use cos_auth::CredentialsCache;
    use cos_types::credential::ProvideCredentials;
    use cos_types::time::{SharedTimeSource, TestingTimeSource, TimeSource};
    use cos_types::{ProviderType, Token};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    #[tokio::test]
    async fn token_source_goes_through_the_factory() {
        let factory = RecordingFactory::default();
        let conf = ProviderConfig::default()
            .with_token_manager_factory(SharedTokenManagerFactory::new(factory.clone()));
        let provider = CustomInitFuncProvider::builder(|| async {
            Ok(Token::from_parts("initA", "initR", "initT", -3600, 0))
        })
        .service_instance_id("instance")
        .configure(&conf)
        .build();
        assert!(provider.is_valid());
        assert!(provider.build_error().is_none());
        assert_eq!(factory.recorded(), vec![Recorded::Issuer]);
        let creds = provider.provide_credentials().await.expect("token");
        assert!(provider.is_expired());
        assert_eq!(creds.provider_name(), CUSTOM_INIT_FUNC_PROVIDER_NAME);
        assert_eq!(creds.provider_type(), ProviderType::OAuth);
        assert_eq!(creds.service_instance_id(), Some("instance"));
    }

    #[tokio::test]
    async fn init_fn_tokens_are_cached_by_the_token_manager() {
        let time = TestingTimeSource::new(UNIX_EPOCH + Duration::from_secs(1000));
        let conf = ProviderConfig::default().with_time_source(SharedTimeSource::new(time.clone()));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let clock = time.clone();
        let provider = CustomInitFuncProvider::builder(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let issued_at = clock.now();
            async move { Ok(Token::new("access", "", "Bearer", 100, issued_at)) }
        })
        .configure(&conf)
        .build();
        assert!(provider.is_expired());
        provider.provide_credentials().await.expect("token");
        provider.provide_credentials().await.expect("token");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(provider.is_expired());
        assert!(!provider.token_manager().map(|tm| tm.is_expired()).unwrap_or(true));

        time.advance(Duration::from_secs(101));
        assert!(provider.token_manager().map(|tm| tm.is_expired()).unwrap_or_default());
        provider.provide_credentials().await.expect("token");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cached_credentials_pick_up_advisory_refreshes() {
        let time = TestingTimeSource::new(UNIX_EPOCH + Duration::from_secs(1000));
        let conf = ProviderConfig::default().with_time_source(SharedTimeSource::new(time.clone()));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let clock = time.clone();
        let provider = CustomInitFuncProvider::builder(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let issued_at = clock.now();
            async move { Ok(Token::new(format!("access-{}", n), "", "Bearer", 100, issued_at)) }
        })
        .configure(&conf)
        .build();
        let cache = CredentialsCache::new(provider);
        let access_token = |creds: cos_types::Credentials| {
            creds.token().map(|t| t.access_token().to_string())
        };

        assert_eq!(access_token(cache.get().await.expect("token")).as_deref(), Some("access-1"));
        assert_eq!(access_token(cache.get().await.expect("token")).as_deref(), Some("access-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // advisory window of a 100s token is 75s to 83s after issue
        time.advance(Duration::from_secs(80));
        assert_eq!(access_token(cache.get().await.expect("token")).as_deref(), Some("access-1"));
        let mut latest = None;
        for _ in 0..100 {
            tokio::task::yield_now().await;
            latest = access_token(cache.get().await.expect("token"));
            if latest.as_deref() == Some("access-2") {
                break;
            }
        }
        assert_eq!(latest.as_deref(), Some("access-2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
