/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::{BoxError, HttpClient};
use bytes::Bytes;
use http::header::HeaderName;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

type ConnectVec = Vec<(http::Request<Bytes>, http::Response<Bytes>)>;

/// A request that was sent, paired with the request the test expected
#[derive(Debug)]
pub struct ValidateRequest {
    pub expected: http::Request<Bytes>,
    pub actual: http::Request<Bytes>,
}

impl ValidateRequest {
    /// Assert that the actual request has the expected uri, body and headers
    pub fn assert_matches(&self, ignore_headers: &[HeaderName]) {
        let (actual, expected) = (&self.actual, &self.expected);
        for (name, value) in expected.headers() {
            if !ignore_headers.contains(name) {
                let actual_header = actual
                    .headers()
                    .get(name)
                    .unwrap_or_else(|| panic!("Header {:?} missing", name));
                assert_eq!(actual_header, value, "Header mismatch for {:?}", name);
            }
        }
        match (
            std::str::from_utf8(actual.body()),
            std::str::from_utf8(expected.body()),
        ) {
            (Ok(actual), Ok(expected)) => assert_eq!(actual, expected),
            _ => assert_eq!(actual.body(), expected.body()),
        };
        assert_eq!(actual.uri(), expected.uri());
        assert_eq!(actual.method(), expected.method());
    }
}

/// Test connection for token issuers
///
/// It will:
/// - Respond to requests with a preloaded series of responses
/// - Record requests for future examination
///
/// ```rust
/// use bytes::Bytes;
/// use cos_hyper::test_connection::TestConnection;
/// let conn = TestConnection::new(vec![(
///     http::Request::new(Bytes::from_static(b"request body")),
///     http::Response::builder()
///         .status(200)
///         .body(Bytes::from_static(b"response body"))
///         .unwrap(),
/// )]);
/// ```
#[derive(Clone, Debug)]
pub struct TestConnection {
    data: Arc<Mutex<ConnectVec>>,
    requests: Arc<Mutex<Vec<ValidateRequest>>>,
}

impl TestConnection {
    pub fn new(mut data: ConnectVec) -> Self {
        data.reverse();
        TestConnection {
            data: Arc::new(Mutex::new(data)),
            requests: Default::default(),
        }
    }

    /// Respond with `responses` in order without any expectation on the requests
    pub fn responding(responses: Vec<http::Response<Bytes>>) -> Self {
        Self::new(
            responses
                .into_iter()
                .map(|response| (http::Request::new(Bytes::new()), response))
                .collect(),
        )
    }

    pub fn requests(&self) -> impl Deref<Target = Vec<ValidateRequest>> + '_ {
        self.requests.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl HttpClient for TestConnection {
    async fn send(&self, actual: http::Request<Bytes>) -> Result<http::Response<Bytes>, BoxError> {
        let next = self.data.lock().unwrap().pop();
        match next {
            Some((expected, response)) => {
                self.requests
                    .lock()
                    .unwrap()
                    .push(ValidateRequest { expected, actual });
                Ok(response)
            }
            None => Err("No more data".into()),
        }
    }
}
