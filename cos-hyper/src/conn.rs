/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::{BoxError, HttpClient};
use bytes::Bytes;
use hyper::client::HttpConnector;
use hyper_tls::HttpsConnector;

const BEGIN_CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----";
const END_CERTIFICATE: &str = "-----END CERTIFICATE-----";

/// A custom CA bundle could not be loaded
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CaBundleError {
    #[error("failed to load custom CA bundle PEM file: no certificates found")]
    NoCertificates,
    #[error("failed to load custom CA bundle PEM file: {0}")]
    InvalidCertificate(#[source] native_tls::Error),
    #[error("failed to build TLS connector: {0}")]
    Tls(#[source] native_tls::Error),
}

/// HTTPS client backed by hyper and native TLS
#[derive(Clone, Debug)]
pub struct HyperClient {
    client: hyper::Client<HttpsConnector<HttpConnector>, hyper::Body>,
}

impl HyperClient {
    /// HTTPS client trusting the platform's root certificates
    pub fn https() -> Self {
        HyperClient {
            client: hyper::Client::builder().build(HttpsConnector::new()),
        }
    }

    /// HTTPS client that additionally trusts every certificate of a PEM bundle
    ///
    /// Fails when the bundle holds no certificate or any certificate is malformed.
    pub fn with_ca_bundle(pem: &[u8]) -> Result<Self, CaBundleError> {
        let mut tls = native_tls::TlsConnector::builder();
        let certificates = pem_certificates(pem);
        if certificates.is_empty() {
            return Err(CaBundleError::NoCertificates);
        }
        for certificate in certificates {
            let certificate = native_tls::Certificate::from_pem(certificate)
                .map_err(CaBundleError::InvalidCertificate)?;
            tls.add_root_certificate(certificate);
        }
        let tls = tls.build().map_err(CaBundleError::Tls)?;
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        let https = HttpsConnector::from((http, tokio_native_tls::TlsConnector::from(tls)));
        tracing::debug!("using custom CA bundle");
        Ok(HyperClient {
            client: hyper::Client::builder().build(https),
        })
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        HyperClient::https()
    }
}

#[async_trait::async_trait]
impl HttpClient for HyperClient {
    async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>, BoxError> {
        let response = self.client.request(request.map(hyper::Body::from)).await?;
        let (parts, body) = response.into_parts();
        let body = hyper::body::to_bytes(body).await?;
        Ok(http::Response::from_parts(parts, body))
    }
}

/// Split a PEM bundle into its certificate blocks
fn pem_certificates(pem: &[u8]) -> Vec<&[u8]> {
    let mut certificates = Vec::new();
    let mut rest = pem;
    while let Some(start) = find(rest, BEGIN_CERTIFICATE.as_bytes()) {
        let block = &rest[start..];
        match find(block, END_CERTIFICATE.as_bytes()) {
            Some(end) => {
                let end = end + END_CERTIFICATE.len();
                certificates.push(&block[..end]);
                rest = &block[end..];
            }
            None => break,
        }
    }
    certificates
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod test {
    use super::{pem_certificates, CaBundleError, HyperClient};

    const BUNDLE: &str = "junk before
-----BEGIN CERTIFICATE-----
AAAA
-----END CERTIFICATE-----
-----BEGIN CERTIFICATE-----
BBBB
-----END CERTIFICATE-----
";

    #[test]
    fn splits_bundle_into_blocks() {
        let blocks = pem_certificates(BUNDLE.as_bytes());
        assert_eq!(blocks.len(), 2);
        assert!(std::str::from_utf8(blocks[1]).unwrap().contains("BBBB"));
        assert!(std::str::from_utf8(blocks[0])
            .unwrap()
            .ends_with("-----END CERTIFICATE-----"));
    }

    #[test]
    fn unterminated_block_is_ignored() {
        assert!(pem_certificates(b"-----BEGIN CERTIFICATE-----\nAAAA").is_empty());
    }

    #[test]
    fn empty_bundle_is_rejected() {
        match HyperClient::with_ca_bundle(b"not a pem file") {
            Err(CaBundleError::NoCertificates) => {}
            other => panic!("expected NoCertificates, got {:?}", other.map(|_| ())),
        }
    }
}
