/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! HTTP client for IAM token requests
//!
//! Token issuers talk to the IAM token service through the [`HttpClient`] trait. The default
//! implementation, [`HyperClient`], is a hyper client over native TLS that optionally trusts a
//! custom CA bundle. Tests use `test_connection::TestConnection`, behind the `test-util` feature.

pub mod conn;
#[cfg(any(test, feature = "test-util"))]
pub mod test_connection;

use bytes::Bytes;
use std::error::Error;
use std::fmt::Debug;
use std::sync::Arc;

pub use conn::{CaBundleError, HyperClient};

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Send a fully buffered request and return a fully buffered response
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync + Debug {
    async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>, BoxError>;
}

/// Reference-counted [`HttpClient`]
#[derive(Clone, Debug)]
pub struct SharedHttpClient(Arc<dyn HttpClient>);

impl SharedHttpClient {
    pub fn new(client: impl HttpClient + 'static) -> Self {
        SharedHttpClient(Arc::new(client))
    }
}

impl From<Arc<dyn HttpClient>> for SharedHttpClient {
    fn from(client: Arc<dyn HttpClient>) -> Self {
        SharedHttpClient(client)
    }
}

#[async_trait::async_trait]
impl HttpClient for SharedHttpClient {
    async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>, BoxError> {
        self.0.send(request).await
    }
}
