/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use cos_types::credential::provide_credentials::{self, future, ProvideCredentials};
use cos_types::credential::SharedCredentialsProvider;
use cos_types::Credentials;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;

/// Caches the credentials of a provider until the provider reports them expired
///
/// The cache lock is held across a retrieval, so at most one retrieval runs per cache and
/// concurrent callers receive its result. A failed retrieval leaves the previous credentials
/// cached.
///
/// ```rust
/// use cos_auth::CredentialsCache;
/// use cos_types::Credentials;
///
/// # async fn docs() {
/// let cache = CredentialsCache::new(Credentials::from_keys("akid", "secret", None, "Static"));
/// let creds = cache.get().await.expect("static credentials");
/// assert_eq!(creds.access_key_id(), "akid");
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CredentialsCache {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    provider: SharedCredentialsProvider,
    cached: Mutex<Option<Credentials>>,
    force_refresh: AtomicBool,
}

impl CredentialsCache {
    pub fn new(provider: impl ProvideCredentials + 'static) -> Self {
        Self::from_shared(SharedCredentialsProvider::new(provider))
    }

    pub fn from_shared(provider: SharedCredentialsProvider) -> Self {
        CredentialsCache {
            inner: Arc::new(Inner {
                provider,
                cached: Mutex::new(None),
                force_refresh: AtomicBool::new(false),
            }),
        }
    }

    /// The cached credentials, retrieved again when missing, expired or force-expired
    pub async fn get(&self) -> provide_credentials::Result {
        let mut cached = self.inner.cached.lock().await;
        let forced = self.inner.force_refresh.swap(false, Ordering::AcqRel);
        if let Some(credentials) = cached.as_ref() {
            if !forced && !self.inner.provider.is_expired() {
                return Ok(credentials.clone());
            }
        }
        let result = self
            .inner
            .provider
            .provide_credentials()
            .instrument(tracing::debug_span!("retrieve_credentials"))
            .await;
        match result {
            Ok(credentials) => {
                tracing::debug!(provider = credentials.provider_name(), "credentials retrieved");
                *cached = Some(credentials.clone());
                Ok(credentials)
            }
            Err(err) => {
                if forced {
                    self.inner.force_refresh.store(true, Ordering::Release);
                }
                Err(err)
            }
        }
    }

    /// Force the next [`get`](CredentialsCache::get) to retrieve new credentials
    pub fn expire(&self) {
        self.inner.force_refresh.store(true, Ordering::Release);
    }

    /// Credentials were force-expired or the provider reports them expired
    pub fn is_expired(&self) -> bool {
        self.inner.force_refresh.load(Ordering::Acquire) || self.inner.provider.is_expired()
    }

    pub fn provider(&self) -> &SharedCredentialsProvider {
        &self.inner.provider
    }
}

impl ProvideCredentials for CredentialsCache {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.get())
    }

    fn is_expired(&self) -> bool {
        CredentialsCache::is_expired(self)
    }
}

#[cfg(test)]
mod test {
    use super::CredentialsCache;
    use cos_types::credential::provide_credentials::{future, ProvideCredentials};
    use cos_types::credential::CredentialsError;
    use cos_types::Credentials;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct State {
        calls: AtomicUsize,
        expired: AtomicBool,
        failing: AtomicBool,
    }

    #[derive(Clone, Debug, Default)]
    struct CountingProvider(Arc<State>);

    impl std::ops::Deref for CountingProvider {
        type Target = State;

        fn deref(&self) -> &State {
            &self.0
        }
    }

    impl CountingProvider {
        async fn load(&self) -> cos_types::credential::Result {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.load(Ordering::SeqCst) {
                return Err(CredentialsError::not_loaded("Failing", "provider failed"));
            }
            Ok(Credentials::from_keys(
                format!("akid-{}", n),
                "secret",
                None,
                "Counting",
            ))
        }
    }

    impl ProvideCredentials for CountingProvider {
        fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
        where
            Self: 'a,
        {
            future::ProvideCredentials::new(self.load())
        }

        fn is_expired(&self) -> bool {
            self.expired.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn reuses_until_expired() {
        let provider = CountingProvider::default();
        let cache = CredentialsCache::new(provider.clone());
        assert_eq!(cache.get().await.unwrap().access_key_id(), "akid-1");
        assert_eq!(cache.get().await.unwrap().access_key_id(), "akid-1");
        provider.expired.store(true, Ordering::SeqCst);
        assert!(cache.is_expired());
        assert_eq!(cache.get().await.unwrap().access_key_id(), "akid-2");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expire_forces_one_retrieval() {
        let provider = CountingProvider::default();
        let cache = CredentialsCache::new(provider.clone());
        cache.get().await.unwrap();
        cache.expire();
        assert!(cache.is_expired());
        assert_eq!(cache.get().await.unwrap().access_key_id(), "akid-2");
        assert!(!cache.is_expired());
        assert_eq!(cache.get().await.unwrap().access_key_id(), "akid-2");
    }

    #[tokio::test]
    async fn failure_keeps_cached_value_and_force_flag() {
        let provider = CountingProvider::default();
        let cache = CredentialsCache::new(provider.clone());
        cache.get().await.unwrap();
        provider.failing.store(true, Ordering::SeqCst);
        cache.expire();
        assert_eq!(
            cache.get().await.expect_err("provider fails").code(),
            "Failing"
        );
        assert!(cache.is_expired());
        provider.failing.store(false, Ordering::SeqCst);
        assert_eq!(cache.get().await.unwrap().access_key_id(), "akid-3");
    }

    #[tokio::test]
    async fn one_retrieval_for_concurrent_callers() {
        let provider = CountingProvider::default();
        let cache = CredentialsCache::new(provider.clone());
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get().await.map(|c| c.access_key_id().to_string()) })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "akid-1");
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
