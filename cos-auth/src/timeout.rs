/*
 * Original Copyright (c) 2021 Tokio Contributors. Licensed under the Apache-2.0 license.
 * Modifications Copyright 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// The token source did not finish before the deadline
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct TimedOut(pub(crate) Duration);

/// Races a token request against a sleep
///
/// A request that completes in the same poll as the sleep wins.
#[pin_project]
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[derive(Debug)]
pub(crate) struct Timeout<T, S> {
    #[pin]
    value: T,
    #[pin]
    sleep: S,
    after: Duration,
}

impl<T> Timeout<T, tokio::time::Sleep> {
    pub(crate) fn after(value: T, after: Duration) -> Self {
        Timeout::new(value, tokio::time::sleep(after), after)
    }
}

impl<T, S> Timeout<T, S> {
    fn new(value: T, sleep: S, after: Duration) -> Timeout<T, S> {
        Timeout {
            value,
            sleep,
            after,
        }
    }
}

impl<T, S> Future for Timeout<T, S>
where
    T: Future,
    S: Future,
{
    type Output = Result<T::Output, TimedOut>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.project();
        if let Poll::Ready(v) = me.value.poll(cx) {
            return Poll::Ready(Ok(v));
        }
        match me.sleep.poll(cx) {
            Poll::Ready(_) => Poll::Ready(Err(TimedOut(*me.after))),
            Poll::Pending => Poll::Pending,
        }
    }
}
