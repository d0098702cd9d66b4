/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Time sources
//!
//! Token expiry decisions always go through a [`TimeSource`] so tests can move the clock without
//! sleeping.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Source of the current wall-clock time
pub trait TimeSource: Debug + Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Time source backed by [`SystemTime::now`]
#[derive(Copy, Clone, Debug, Default)]
#[non_exhaustive]
pub struct SystemTimeSource;

impl SystemTimeSource {
    pub fn new() -> Self {
        SystemTimeSource
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Reference-counted [`TimeSource`]
#[derive(Clone, Debug)]
pub struct SharedTimeSource(Arc<dyn TimeSource>);

impl SharedTimeSource {
    pub fn new(source: impl TimeSource + 'static) -> Self {
        SharedTimeSource(Arc::new(source))
    }
}

impl Default for SharedTimeSource {
    fn default() -> Self {
        SharedTimeSource::new(SystemTimeSource)
    }
}

impl TimeSource for SharedTimeSource {
    fn now(&self) -> SystemTime {
        self.0.now()
    }
}

/// Time source that can be manually moved for tests
///
/// Clones share the same clock.
///
/// # Examples
///
/// ```rust
/// use cos_types::time::{TestingTimeSource, TimeSource};
/// use std::time::{Duration, UNIX_EPOCH};
/// let time = TestingTimeSource::new(UNIX_EPOCH);
/// time.advance(Duration::from_secs(100));
/// assert_eq!(time.now(), UNIX_EPOCH + Duration::from_secs(100));
/// ```
#[derive(Clone, Debug)]
pub struct TestingTimeSource {
    now: Arc<Mutex<SystemTime>>,
}

impl TestingTimeSource {
    pub fn new(start_time: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start_time)),
        }
    }

    pub fn set_time(&self, time: SystemTime) {
        *self.lock() = time;
    }

    pub fn advance(&self, delta: Duration) {
        *self.lock() += delta;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SystemTime> {
        // the guarded value is a plain timestamp, a poisoned lock still holds a valid one
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TimeSource for TestingTimeSource {
    fn now(&self) -> SystemTime {
        *self.lock()
    }
}

#[cfg(test)]
mod test {
    use super::{SharedTimeSource, TestingTimeSource, TimeSource};
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn testing_time_source_is_shared_between_clones() {
        let time = TestingTimeSource::new(UNIX_EPOCH);
        let shared = SharedTimeSource::new(time.clone());
        assert_eq!(shared.now(), UNIX_EPOCH);
        time.advance(Duration::from_secs(10));
        assert_eq!(shared.now(), UNIX_EPOCH + Duration::from_secs(10));
        time.set_time(UNIX_EPOCH);
        assert_eq!(shared.now(), UNIX_EPOCH);
    }
}
