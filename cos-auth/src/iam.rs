/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Clients for the IAM token service
//!
//! Both grants POST a form to the token endpoint and receive a JSON token:
//! - [`ApiKeyTokenIssuer`]: `urn:ibm:params:oauth:grant-type:apikey`
//! - [`ContainerTokenIssuer`]: `urn:ibm:params:oauth:grant-type:cr-token`, exchanging the compute
//!   resource token of a workload for a trusted profile token

use crate::TokenError;
use bytes::Bytes;
use cos_hyper::{HttpClient, SharedHttpClient};
use cos_types::os_shim_internal::Fs;
use cos_types::time::{SharedTimeSource, TimeSource};
use cos_types::Token;
use http::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Token endpoint used when none is configured
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://iam.cloud.ibm.com/identity/token";

const API_KEY_GRANT: &str = "urn:ibm:params:oauth:grant-type:apikey";
const CR_TOKEN_GRANT: &str = "urn:ibm:params:oauth:grant-type:cr-token";

/// A source of fresh IAM tokens
#[async_trait::async_trait]
pub trait IssueToken: Send + Sync + Debug {
    async fn issue_token(&self) -> Result<Token, TokenError>;
}

/// Reference-counted [`IssueToken`]
#[derive(Clone, Debug)]
pub struct SharedTokenIssuer(Arc<dyn IssueToken>);

impl SharedTokenIssuer {
    pub fn new(issuer: impl IssueToken + 'static) -> Self {
        SharedTokenIssuer(Arc::new(issuer))
    }
}

#[async_trait::async_trait]
impl IssueToken for SharedTokenIssuer {
    async fn issue_token(&self) -> Result<Token, TokenError> {
        self.0.issue_token().await
    }
}

/// Token source backed by an async closure
///
/// ```rust
/// use cos_auth::iam::issue_token_fn;
/// use cos_types::Token;
/// use std::time::SystemTime;
/// let issuer = issue_token_fn(|| async {
///     Ok(Token::new("access", "refresh", "Bearer", 3600, SystemTime::now()))
/// });
/// ```
pub fn issue_token_fn<F, Fut>(f: F) -> IssueTokenFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Token, TokenError>> + Send,
{
    IssueTokenFn { f }
}

/// See [`issue_token_fn`]
#[derive(Copy, Clone)]
pub struct IssueTokenFn<F> {
    f: F,
}

impl<F> Debug for IssueTokenFn<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "IssueTokenFn")
    }
}

#[async_trait::async_trait]
impl<F, Fut> IssueToken for IssueTokenFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Token, TokenError>> + Send,
{
    async fn issue_token(&self) -> Result<Token, TokenError> {
        (self.f)().await
    }
}

/// Exchanges an API key for an IAM token
pub struct ApiKeyTokenIssuer {
    api_key: Zeroizing<String>,
    endpoint: String,
    http: SharedHttpClient,
    time: SharedTimeSource,
}

impl ApiKeyTokenIssuer {
    /// `endpoint` falls back to [`DEFAULT_AUTH_ENDPOINT`] when `None` or empty
    pub fn new(
        api_key: impl Into<String>,
        endpoint: Option<&str>,
        http: SharedHttpClient,
        time: SharedTimeSource,
    ) -> Self {
        ApiKeyTokenIssuer {
            api_key: Zeroizing::new(api_key.into()),
            endpoint: endpoint_or_default(endpoint),
            http,
            time,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Debug for ApiKeyTokenIssuer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyTokenIssuer")
            .field("api_key", &"** redacted **")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait::async_trait]
impl IssueToken for ApiKeyTokenIssuer {
    async fn issue_token(&self) -> Result<Token, TokenError> {
        let form = [
            ("grant_type", API_KEY_GRANT),
            ("response_type", "cloud_iam"),
            ("apikey", self.api_key.as_str()),
        ];
        request_token(&self.http, &self.time, &self.endpoint, &form).await
    }
}

/// Exchanges the compute resource token of a workload for a trusted profile token
///
/// The CR token file is read again for every request: the platform rotates it in place.
pub struct ContainerTokenIssuer {
    cr_token_file: PathBuf,
    profile_name: Option<String>,
    profile_id: Option<String>,
    endpoint: String,
    fs: Fs,
    http: SharedHttpClient,
    time: SharedTimeSource,
}

impl ContainerTokenIssuer {
    pub fn builder() -> ContainerTokenIssuerBuilder {
        ContainerTokenIssuerBuilder::default()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn read_cr_token(&self) -> Result<Zeroizing<String>, TokenError> {
        let token = self
            .fs
            .read_to_string(&self.cr_token_file)
            .map_err(|source| TokenError::CrTokenRead {
                path: self.cr_token_file.to_string_lossy().into(),
                source,
            })?;
        Ok(Zeroizing::new(token.trim().to_string()))
    }
}

impl Debug for ContainerTokenIssuer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerTokenIssuer")
            .field("cr_token_file", &self.cr_token_file)
            .field("profile_name", &self.profile_name)
            .field("profile_id", &self.profile_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait::async_trait]
impl IssueToken for ContainerTokenIssuer {
    async fn issue_token(&self) -> Result<Token, TokenError> {
        let cr_token = self.read_cr_token()?;
        let mut form = vec![("grant_type", CR_TOKEN_GRANT), ("cr_token", cr_token.as_str())];
        if let Some(name) = &self.profile_name {
            form.push(("profile_name", name.as_str()));
        }
        if let Some(id) = &self.profile_id {
            form.push(("profile_id", id.as_str()));
        }
        request_token(&self.http, &self.time, &self.endpoint, &form).await
    }
}

/// Builder for [`ContainerTokenIssuer`]
#[derive(Debug, Default)]
pub struct ContainerTokenIssuerBuilder {
    cr_token_file: Option<PathBuf>,
    profile_name: Option<String>,
    profile_id: Option<String>,
    endpoint: Option<String>,
    fs: Option<Fs>,
    http: Option<SharedHttpClient>,
    time: Option<SharedTimeSource>,
}

impl ContainerTokenIssuerBuilder {
    pub fn cr_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cr_token_file = Some(path.into());
        self
    }

    /// Empty names are ignored
    pub fn profile_name(mut self, name: impl Into<String>) -> Self {
        self.profile_name = Some(name.into()).filter(|name: &String| !name.is_empty());
        self
    }

    /// Empty IDs are ignored
    pub fn profile_id(mut self, id: impl Into<String>) -> Self {
        self.profile_id = Some(id.into()).filter(|id: &String| !id.is_empty());
        self
    }

    pub fn endpoint(mut self, endpoint: Option<&str>) -> Self {
        self.endpoint = endpoint.map(str::to_string);
        self
    }

    pub fn fs(mut self, fs: Fs) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn http_client(mut self, http: SharedHttpClient) -> Self {
        self.http = Some(http);
        self
    }

    pub fn time_source(mut self, time: SharedTimeSource) -> Self {
        self.time = Some(time);
        self
    }

    pub fn build(self) -> ContainerTokenIssuer {
        ContainerTokenIssuer {
            cr_token_file: self.cr_token_file.unwrap_or_default(),
            profile_name: self.profile_name,
            profile_id: self.profile_id,
            endpoint: endpoint_or_default(self.endpoint.as_deref()),
            fs: self.fs.unwrap_or_default(),
            http: self
                .http
                .unwrap_or_else(|| SharedHttpClient::new(cos_hyper::HyperClient::https())),
            time: self.time.unwrap_or_default(),
        }
    }
}

fn endpoint_or_default(endpoint: Option<&str>) -> String {
    match endpoint {
        Some(endpoint) if !endpoint.is_empty() => endpoint.to_string(),
        _ => {
            tracing::debug!(endpoint = DEFAULT_AUTH_ENDPOINT, "using default auth endpoint");
            DEFAULT_AUTH_ENDPOINT.to_string()
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    token_type: String,
    expires_in: i64,
    #[serde(default)]
    expiration: Option<i64>,
}

async fn request_token(
    http: &SharedHttpClient,
    time: &SharedTimeSource,
    endpoint: &str,
    form: &[(&str, &str)],
) -> Result<Token, TokenError> {
    let body = serde_urlencoded::to_string(form)
        .map_err(|err| TokenError::InvalidRequest(err.to_string().into()))?;
    let request = http::Request::builder()
        .method(http::Method::POST)
        .uri(endpoint)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(ACCEPT, "application/json")
        .body(Bytes::from(body))
        .map_err(|err| TokenError::InvalidRequest(err.to_string().into()))?;
    let issued_at = time.now();
    let response = http.send(request).await.map_err(TokenError::Dispatch)?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        tracing::debug!(status, endpoint, "token request rejected");
        return Err(TokenError::Service {
            status,
            message: String::from_utf8_lossy(response.body()).into_owned(),
        });
    }
    let parsed: TokenResponse =
        serde_json::from_slice(response.body()).map_err(TokenError::InvalidResponse)?;
    tracing::debug!(expires_in = parsed.expires_in, "token issued");
    Ok(match parsed.expiration {
        Some(expiration) => Token::from_parts(
            parsed.access_token,
            parsed.refresh_token,
            parsed.token_type,
            parsed.expires_in,
            expiration,
        ),
        None => Token::new(
            parsed.access_token,
            parsed.refresh_token,
            parsed.token_type,
            parsed.expires_in,
            issued_at,
        ),
    })
}
