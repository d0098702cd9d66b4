/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Token lifecycle
//!
//! A [`TokenManager`] holds at most one live token. Two thresholds derived from the token lifetime
//! decide when it is refreshed:
//!
//! ```text
//! issued ........ advisory ...... mandatory ...... expiration
//!   cached token   | refresh in the | caller waits for
//!   returned       | background     | a new token
//! ```
//!
//! With the defaults, the advisory refresh time is 25% of the lifetime before expiration and the
//! mandatory refresh time 17% before expiration.

use crate::iam::{ApiKeyTokenIssuer, IssueToken, SharedTokenIssuer};
use crate::timeout::{TimedOut, Timeout};
use crate::TokenError;
use cos_hyper::SharedHttpClient;
use cos_types::time::{SharedTimeSource, TimeSource};
use cos_types::Token;
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::Instrument;

const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);
const MIN_BACKGROUND_WAIT: Duration = Duration::from_secs(2);

/// Maps a token lifetime to how long before expiration a threshold lies
pub type RefreshThreshold = Arc<dyn Fn(Duration) -> Duration + Send + Sync>;

/// Advisory threshold: 25% of the lifetime
pub fn default_advisory_threshold(lifetime: Duration) -> Duration {
    lifetime / 4
}

/// Mandatory threshold: 17% of the lifetime
pub fn default_mandatory_threshold(lifetime: Duration) -> Duration {
    lifetime * 17 / 100
}

/// Keeps a token fresh
#[async_trait::async_trait]
pub trait ManageToken: Send + Sync + Debug {
    /// The cached token, refreshed according to the advisory and mandatory thresholds
    async fn get(&self) -> Result<Token, TokenError>;

    /// Unconditionally fetch a new token
    async fn refresh(&self) -> Result<Token, TokenError>;

    /// No token is cached or the mandatory refresh time has passed
    fn is_expired(&self) -> bool;

    fn start_background_refresh(&self);

    fn stop_background_refresh(&self);
}

/// Reference-counted [`ManageToken`]
#[derive(Clone, Debug)]
pub struct SharedTokenManager(Arc<dyn ManageToken>);

impl SharedTokenManager {
    pub fn new(manager: impl ManageToken + 'static) -> Self {
        SharedTokenManager(Arc::new(manager))
    }
}

#[async_trait::async_trait]
impl ManageToken for SharedTokenManager {
    async fn get(&self) -> Result<Token, TokenError> {
        self.0.get().await
    }

    async fn refresh(&self) -> Result<Token, TokenError> {
        self.0.refresh().await
    }

    fn is_expired(&self) -> bool {
        self.0.is_expired()
    }

    fn start_background_refresh(&self) {
        self.0.start_background_refresh()
    }

    fn stop_background_refresh(&self) {
        self.0.stop_background_refresh()
    }
}

/// Stores a value in a RwLock and never holds the lock across code that can panic
struct RwCell<T: Clone> {
    value: RwLock<T>,
}

impl<T: Clone> RwCell<T> {
    fn new(initial: T) -> Self {
        RwCell {
            value: RwLock::new(initial),
        }
    }

    fn get(&self) -> T {
        match self.value.read() {
            Ok(value) => value.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, value: T) {
        match self.value.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

struct BackgroundRefresh {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl BackgroundRefresh {
    fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.task.abort();
    }
}

struct Inner {
    issuer: SharedTokenIssuer,
    time: SharedTimeSource,
    advisory: RefreshThreshold,
    mandatory: RefreshThreshold,
    refresh_timeout: Duration,
    token: RwCell<Option<Token>>,
    refresh_gate: tokio::sync::Mutex<()>,
    advisory_refresh_in_flight: AtomicBool,
    background: Mutex<Option<BackgroundRefresh>>,
}

impl Inner {
    fn advisory_refresh_time(&self, token: &Token) -> SystemTime {
        threshold_time(token, &self.advisory)
    }

    fn mandatory_refresh_time(&self, token: &Token) -> SystemTime {
        threshold_time(token, &self.mandatory)
    }

    fn is_expired(&self) -> bool {
        match self.token.get() {
            Some(token) => self.time.now() > self.mandatory_refresh_time(&token),
            None => true,
        }
    }

    /// Fetch a token while holding the refresh gate
    ///
    /// On failure the previous token stays cached.
    async fn refresh_locked(&self) -> Result<Token, TokenError> {
        let result = match Timeout::after(self.issuer.issue_token(), self.refresh_timeout).await {
            Ok(result) => result,
            Err(TimedOut(after)) => Err(TokenError::Timeout(after)),
        };
        match result {
            Ok(token) => {
                tracing::debug!(expiration = token.expiration(), "token refreshed");
                self.token.set(Some(token.clone()));
                Ok(token)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                Err(err)
            }
        }
    }

    async fn refresh(&self) -> Result<Token, TokenError> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Refresh unless another caller already replaced the stale token
    async fn refresh_if_stale(&self) -> Result<Token, TokenError> {
        let _gate = self.refresh_gate.lock().await;
        if let Some(token) = self.token.get() {
            if self.time.now() <= self.mandatory_refresh_time(&token) {
                return Ok(token);
            }
        }
        self.refresh_locked().await
    }

    fn next_background_wait(&self) -> Duration {
        match self.token.get() {
            Some(token) => self
                .advisory_refresh_time(&token)
                .duration_since(self.time.now())
                .unwrap_or_default()
                .max(MIN_BACKGROUND_WAIT),
            None => Duration::from_secs(0),
        }
    }

    fn stop_background_refresh(&self) {
        let background = match self.background.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(background) = background {
            tracing::debug!("stopping background token refresh");
            background.stop();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop_background_refresh();
    }
}

fn threshold_time(token: &Token, threshold: &RefreshThreshold) -> SystemTime {
    token
        .expiration_time()
        .checked_sub(threshold(token.lifetime()))
        .unwrap_or(UNIX_EPOCH)
}

async fn background_refresh_loop(inner: Weak<Inner>, mut shutdown: oneshot::Receiver<()>) {
    loop {
        let wait = match inner.upgrade() {
            Some(inner) => inner.next_background_wait(),
            None => return,
        };
        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(wait) => {}
        }
        let inner = match inner.upgrade() {
            Some(inner) => inner,
            None => return,
        };
        // failures are logged by `refresh_locked`, the next iteration retries
        let _ = inner.refresh().await;
    }
}

/// Default [`ManageToken`] implementation
///
/// Clones share the same token and background task. The background task stops when the last
/// clone is dropped.
///
/// ```rust
/// use cos_auth::iam::issue_token_fn;
/// use cos_auth::token_manager::{ManageToken, TokenManager};
/// use cos_types::Token;
/// use std::time::SystemTime;
///
/// # async fn docs() {
/// let manager = TokenManager::builder()
///     .issuer(issue_token_fn(|| async {
///         Ok(Token::new("access", "refresh", "Bearer", 3600, SystemTime::now()))
///     }))
///     .build();
/// let token = manager.get().await.expect("token issued");
/// assert_eq!(token.access_token(), "access");
/// # }
/// ```
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl TokenManager {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Refresh in the background unless such a refresh is already running
    fn spawn_advisory_refresh(&self) {
        if self
            .inner
            .advisory_refresh_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                self.inner
                    .advisory_refresh_in_flight
                    .store(false, Ordering::Release);
                return;
            }
        };
        let inner = self.inner.clone();
        runtime.spawn(
            async move {
                let _ = inner.refresh_if_advised().await;
                inner
                    .advisory_refresh_in_flight
                    .store(false, Ordering::Release);
            }
            .instrument(tracing::debug_span!("advisory_token_refresh")),
        );
    }
}

impl Inner {
    async fn refresh_if_advised(&self) -> Result<(), TokenError> {
        let _gate = self.refresh_gate.lock().await;
        if let Some(token) = self.token.get() {
            if self.time.now() <= self.advisory_refresh_time(&token) {
                return Ok(());
            }
        }
        self.refresh_locked().await.map(|_| ())
    }
}

impl Debug for TokenManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("issuer", &self.inner.issuer)
            .field("token", &self.inner.token.get())
            .field("refresh_timeout", &self.inner.refresh_timeout)
            .finish()
    }
}

#[async_trait::async_trait]
impl ManageToken for TokenManager {
    async fn get(&self) -> Result<Token, TokenError> {
        let now = self.inner.time.now();
        match self.inner.token.get() {
            Some(token) if now <= self.inner.advisory_refresh_time(&token) => Ok(token),
            Some(token) if now <= self.inner.mandatory_refresh_time(&token) => {
                tracing::debug!("token past advisory refresh time");
                self.spawn_advisory_refresh();
                Ok(token)
            }
            _ => self.inner.refresh_if_stale().await,
        }
    }

    async fn refresh(&self) -> Result<Token, TokenError> {
        self.inner.refresh().await
    }

    fn is_expired(&self) -> bool {
        self.inner.is_expired()
    }

    /// Start a task that refreshes the token at its advisory refresh time
    ///
    /// Does nothing when a task is already running or no tokio runtime is available.
    fn start_background_refresh(&self) {
        let mut background = match self.inner.background.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if background.is_some() {
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("no tokio runtime available, background token refresh not started");
                return;
            }
        };
        let (shutdown, receiver) = oneshot::channel();
        let task = runtime.spawn(
            background_refresh_loop(Arc::downgrade(&self.inner), receiver)
                .instrument(tracing::debug_span!("background_token_refresh")),
        );
        tracing::debug!("started background token refresh");
        *background = Some(BackgroundRefresh {
            shutdown: Some(shutdown),
            task,
        });
    }

    fn stop_background_refresh(&self) {
        self.inner.stop_background_refresh()
    }
}

/// Builder for [`TokenManager`]
#[derive(Default)]
pub struct Builder {
    issuer: Option<SharedTokenIssuer>,
    time: Option<SharedTimeSource>,
    advisory: Option<RefreshThreshold>,
    mandatory: Option<RefreshThreshold>,
    refresh_timeout: Option<Duration>,
}

impl Builder {
    pub fn issuer(mut self, issuer: impl IssueToken + 'static) -> Self {
        self.issuer = Some(SharedTokenIssuer::new(issuer));
        self
    }

    pub fn shared_issuer(mut self, issuer: SharedTokenIssuer) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn time_source(mut self, time: SharedTimeSource) -> Self {
        self.time = Some(time);
        self
    }

    pub fn advisory_threshold(mut self, threshold: RefreshThreshold) -> Self {
        self.advisory = Some(threshold);
        self
    }

    pub fn mandatory_threshold(mut self, threshold: RefreshThreshold) -> Self {
        self.mandatory = Some(threshold);
        self
    }

    /// Maximum time a single refresh may take. Defaults to 30 seconds.
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    /// Build the manager
    ///
    /// A manager without an issuer fails every refresh.
    pub fn build(self) -> TokenManager {
        let issuer = self.issuer.unwrap_or_else(|| {
            SharedTokenIssuer::new(crate::iam::issue_token_fn(|| async {
                Err(TokenError::issuer("no token issuer configured"))
            }))
        });
        TokenManager {
            inner: Arc::new(Inner {
                issuer,
                time: self.time.unwrap_or_default(),
                advisory: self
                    .advisory
                    .unwrap_or_else(|| Arc::new(default_advisory_threshold)),
                mandatory: self
                    .mandatory
                    .unwrap_or_else(|| Arc::new(default_mandatory_threshold)),
                refresh_timeout: self.refresh_timeout.unwrap_or(DEFAULT_REFRESH_TIMEOUT),
                token: RwCell::new(None),
                refresh_gate: tokio::sync::Mutex::new(()),
                advisory_refresh_in_flight: AtomicBool::new(false),
                background: Mutex::new(None),
            }),
        }
    }
}

/// Where a token manager gets its tokens
#[derive(Clone)]
#[non_exhaustive]
pub enum TokenSource {
    /// Exchange an API key at `auth_endpoint`, or the default IAM endpoint
    ApiKey {
        api_key: String,
        auth_endpoint: Option<String>,
    },
    /// Any token issuer, for example a caller-supplied function
    Issuer(SharedTokenIssuer),
}

impl Debug for TokenSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::ApiKey { auth_endpoint, .. } => f
                .debug_struct("ApiKey")
                .field("api_key", &"** redacted **")
                .field("auth_endpoint", auth_endpoint)
                .finish(),
            TokenSource::Issuer(issuer) => f.debug_tuple("Issuer").field(issuer).finish(),
        }
    }
}

/// Creates the token manager of a credentials provider
///
/// Providers receive the factory at construction so tests can substitute fake managers.
pub trait TokenManagerFactory: Send + Sync + Debug {
    fn token_manager(&self, source: TokenSource) -> SharedTokenManager;
}

/// Reference-counted [`TokenManagerFactory`]
#[derive(Clone, Debug)]
pub struct SharedTokenManagerFactory(Arc<dyn TokenManagerFactory>);

impl SharedTokenManagerFactory {
    pub fn new(factory: impl TokenManagerFactory + 'static) -> Self {
        SharedTokenManagerFactory(Arc::new(factory))
    }
}

impl TokenManagerFactory for SharedTokenManagerFactory {
    fn token_manager(&self, source: TokenSource) -> SharedTokenManager {
        self.0.token_manager(source)
    }
}

/// Builds [`TokenManager`]s that share an HTTP client and a time source
#[derive(Clone)]
pub struct DefaultTokenManagerFactory {
    http: SharedHttpClient,
    time: SharedTimeSource,
    advisory: RefreshThreshold,
    mandatory: RefreshThreshold,
    refresh_timeout: Duration,
}

impl DefaultTokenManagerFactory {
    pub fn new(http: SharedHttpClient, time: SharedTimeSource) -> Self {
        DefaultTokenManagerFactory {
            http,
            time,
            advisory: Arc::new(default_advisory_threshold),
            mandatory: Arc::new(default_mandatory_threshold),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    pub fn with_thresholds(mut self, advisory: RefreshThreshold, mandatory: RefreshThreshold) -> Self {
        self.advisory = advisory;
        self.mandatory = mandatory;
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }
}

impl Debug for DefaultTokenManagerFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultTokenManagerFactory")
            .field("http", &self.http)
            .field("refresh_timeout", &self.refresh_timeout)
            .finish()
    }
}

impl TokenManagerFactory for DefaultTokenManagerFactory {
    fn token_manager(&self, source: TokenSource) -> SharedTokenManager {
        let issuer = match source {
            TokenSource::ApiKey {
                api_key,
                auth_endpoint,
            } => SharedTokenIssuer::new(ApiKeyTokenIssuer::new(
                api_key,
                auth_endpoint.as_deref(),
                self.http.clone(),
                self.time.clone(),
            )),
            TokenSource::Issuer(issuer) => issuer,
        };
        SharedTokenManager::new(
            TokenManager::builder()
                .shared_issuer(issuer)
                .time_source(self.time.clone())
                .advisory_threshold(self.advisory.clone())
                .mandatory_threshold(self.mandatory.clone())
                .refresh_timeout(self.refresh_timeout)
                .build(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::{ManageToken, TokenManager};
    use crate::iam::issue_token_fn;
    use crate::TokenError;
    use cos_types::time::{SharedTimeSource, TestingTimeSource, TimeSource};
    use cos_types::Token;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};
    use tracing_test::traced_test;

    /// Manager whose issuer hands out `token-N` tokens valid for 100 seconds
    fn counting_manager(time: &TestingTimeSource) -> (TokenManager, Arc<AtomicUsize>) {
        let issued = Arc::new(AtomicUsize::new(0));
        let counter = issued.clone();
        let clock = time.clone();
        let manager = TokenManager::builder()
            .issuer(issue_token_fn(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                let now = clock.now();
                async move {
                    Ok(Token::new(
                        format!("token-{}", n),
                        "",
                        "Bearer",
                        100,
                        now,
                    ))
                }
            }))
            .time_source(SharedTimeSource::new(time.clone()))
            .build();
        (manager, issued)
    }

    fn epoch_plus(secs: u64) -> std::time::SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[tokio::test]
    async fn fresh_token_is_cached() {
        let time = TestingTimeSource::new(epoch_plus(1000));
        let (manager, issued) = counting_manager(&time);
        assert!(manager.is_expired());
        assert_eq!(manager.get().await.unwrap().access_token(), "token-1");
        time.advance(Duration::from_secs(70));
        assert_eq!(manager.get().await.unwrap().access_token(), "token-1");
        assert!(!manager.is_expired());
        assert_eq!(issued.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn past_advisory_returns_stale_token_and_refreshes_in_background() {
        let time = TestingTimeSource::new(epoch_plus(1000));
        let (manager, issued) = counting_manager(&time);
        manager.get().await.unwrap();
        // advisory at 75s, mandatory at 83s
        time.advance(Duration::from_secs(80));
        assert_eq!(manager.get().await.unwrap().access_token(), "token-1");
        for _ in 0..100 {
            if issued.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(issued.load(Ordering::SeqCst), 2);
        assert_eq!(manager.get().await.unwrap().access_token(), "token-2");
    }

    #[tokio::test]
    async fn past_mandatory_blocks_on_refresh() {
        let time = TestingTimeSource::new(epoch_plus(1000));
        let (manager, _) = counting_manager(&time);
        manager.get().await.unwrap();
        time.advance(Duration::from_secs(90));
        assert!(manager.is_expired());
        assert_eq!(manager.get().await.unwrap().access_token(), "token-2");
        assert!(!manager.is_expired());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let time = TestingTimeSource::new(epoch_plus(1000));
        let (manager, issued) = counting_manager(&time);
        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.get().await.map(|t| t.access_token().to_string()) })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "token-1");
        }
        assert_eq!(issued.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_refresh_keeps_stale_token() {
        let time = TestingTimeSource::new(epoch_plus(1000));
        let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let should_fail = fail.clone();
        let clock = time.clone();
        let manager = TokenManager::builder()
            .issuer(issue_token_fn(move || {
                let failing = should_fail.load(Ordering::SeqCst);
                let now = clock.now();
                async move {
                    if failing {
                        Err(TokenError::issuer("iam unavailable"))
                    } else {
                        Ok(Token::new("good", "", "Bearer", 100, now))
                    }
                }
            }))
            .time_source(SharedTimeSource::new(time.clone()))
            .build();
        manager.get().await.unwrap();
        fail.store(true, Ordering::SeqCst);
        manager.refresh().await.expect_err("issuer fails");
        assert!(logs_contain("token refresh failed"));
        // the stale token is still valid and still served
        assert_eq!(manager.get().await.unwrap().access_token(), "good");
        fail.store(false, Ordering::SeqCst);
        assert_eq!(manager.refresh().await.unwrap().access_token(), "good");
    }

    #[tokio::test]
    async fn custom_thresholds() {
        let time = TestingTimeSource::new(epoch_plus(1000));
        let clock = time.clone();
        let manager = TokenManager::builder()
            .issuer(issue_token_fn(move || {
                let now = clock.now();
                async move { Ok(Token::new("t", "", "Bearer", 100, now)) }
            }))
            .time_source(SharedTimeSource::new(time.clone()))
            .advisory_threshold(Arc::new(|lifetime| lifetime / 2))
            .mandatory_threshold(Arc::new(|lifetime| lifetime / 10))
            .build();
        manager.get().await.unwrap();
        time.advance(Duration::from_secs(89));
        assert!(!manager.is_expired());
        time.advance(Duration::from_secs(2));
        assert!(manager.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_times_out() {
        let manager = TokenManager::builder()
            .issuer(issue_token_fn(|| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Token::from_parts("late", "", "Bearer", 1, 1))
            }))
            .refresh_timeout(Duration::from_secs(5))
            .build();
        let err = manager.get().await.expect_err("times out");
        assert_eq!(err.code(), "TokenRefreshTimeout");
    }

    #[tokio::test(start_paused = true)]
    async fn background_refresh_runs_until_stopped() {
        let time = TestingTimeSource::new(epoch_plus(1000));
        let (manager, issued) = counting_manager(&time);
        manager.start_background_refresh();
        // starting twice is a no-op
        manager.start_background_refresh();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(issued.load(Ordering::SeqCst), 1);
        // next refresh at the advisory time, 75 seconds after issue
        tokio::time::sleep(Duration::from_secs(76)).await;
        assert_eq!(issued.load(Ordering::SeqCst), 2);

        manager.stop_background_refresh();
        manager.stop_background_refresh();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(issued.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_manager_stops_background_refresh() {
        let time = TestingTimeSource::new(epoch_plus(1000));
        let (manager, issued) = counting_manager(&time);
        manager.start_background_refresh();
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(manager);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(issued.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_before_start_is_safe() {
        let time = TestingTimeSource::new(epoch_plus(1000));
        let (manager, _) = counting_manager(&time);
        manager.stop_background_refresh();
        // outside a runtime the background task cannot start
        manager.start_background_refresh();
        assert!(manager.is_expired());
    }
}
