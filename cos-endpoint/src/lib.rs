/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Endpoint resolution for the IBM Cloud Object Storage SDK
//!
//! A [`ResolveEndpoint`] turns a service name and a region into the URL requests are sent to,
//! together with the region and service name used to sign them.

use cos_types::{Region, SigningRegion, SigningService};
use http::Uri;
use std::borrow::Cow;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_DNS_SUFFIX: &str = "cloud-object-storage.appdomain.cloud";

const HOSTNAME_TEMPLATE: &str = "{service}.{region}.{dnsSuffix}";
const DUAL_STACK_HOSTNAME_TEMPLATE: &str = "{service}.dualstack.{region}.{dnsSuffix}";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EndpointError {
    #[error("could not find region configuration for {service}")]
    MissingRegion { service: String },

    #[error("could not resolve endpoint for unknown service: {service}, region: {region}")]
    UnknownService { service: String, region: String },

    #[error("invalid endpoint URL {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: http::uri::InvalidUri,
    },
}

impl EndpointError {
    pub fn code(&self) -> &'static str {
        match self {
            EndpointError::MissingRegion { .. } => "MissingRegion",
            EndpointError::UnknownService { .. } => "UnknownServiceError",
            EndpointError::InvalidUrl { .. } => "InvalidEndpointURL",
        }
    }
}

/// Options applied to a single resolution
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EndpointOptions {
    /// Resolve to `http` instead of `https`
    pub disable_ssl: bool,

    /// Use the dual-stack (IPv4 and IPv6) hostname
    pub use_dual_stack: bool,

    /// Resolve services the resolver has no metadata for using the default hostname template
    pub resolve_unknown_service: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub url: String,
    pub signing_region: Option<SigningRegion>,
    pub signing_name: Option<SigningService>,

    /// `true` when the signing name was derived from the service name rather than modeled
    pub signing_name_derived: bool,
}

impl ResolvedEndpoint {
    pub fn uri(&self) -> Result<Uri, EndpointError> {
        self.url
            .parse()
            .map_err(|source| EndpointError::InvalidUrl {
                url: self.url.clone(),
                source,
            })
    }
}

pub trait ResolveEndpoint: Send + Sync + Debug {
    fn endpoint_for(
        &self,
        service: &str,
        region: Option<&Region>,
        options: &EndpointOptions,
    ) -> Result<ResolvedEndpoint, EndpointError>;
}

#[derive(Clone, Debug)]
pub struct SharedEndpointResolver(Arc<dyn ResolveEndpoint>);

impl SharedEndpointResolver {
    pub fn new(resolver: impl ResolveEndpoint + 'static) -> Self {
        SharedEndpointResolver(Arc::new(resolver))
    }
}

impl ResolveEndpoint for SharedEndpointResolver {
    fn endpoint_for(
        &self,
        service: &str,
        region: Option<&Region>,
        options: &EndpointOptions,
    ) -> Result<ResolvedEndpoint, EndpointError> {
        self.0.endpoint_for(service, region, options)
    }
}

impl Default for SharedEndpointResolver {
    fn default() -> Self {
        SharedEndpointResolver::new(DefaultEndpointResolver::new())
    }
}

/// Prefixes `endpoint` with `https://` (or `http://` when `disable_ssl`) unless it already
/// carries a scheme
///
/// ```rust
/// use cos_endpoint::add_scheme;
/// assert_eq!(add_scheme("localhost:8080", true), "http://localhost:8080");
/// assert_eq!(add_scheme("https://s3.us.cloud-object-storage.appdomain.cloud", true), "https://s3.us.cloud-object-storage.appdomain.cloud");
/// ```
pub fn add_scheme(endpoint: &str, disable_ssl: bool) -> String {
    if has_scheme(endpoint) {
        return endpoint.to_string();
    }
    let scheme = if disable_ssl { "http" } else { "https" };
    format!("{}://{}", scheme, endpoint)
}

fn has_scheme(endpoint: &str) -> bool {
    match endpoint.find("://") {
        Some(idx) => idx > 0 && !endpoint[..idx].contains(':'),
        None => false,
    }
}

/// Template based resolver for IBM Cloud Object Storage
///
/// Hostnames are built as `{service}.{region}.{dnsSuffix}` (`{service}.dualstack.{region}.{dnsSuffix}`
/// with dual-stack enabled). The signing region is the requested region and the signing name is
/// the service name.
#[derive(Clone, Debug)]
pub struct DefaultEndpointResolver {
    dns_suffix: Cow<'static, str>,
    known_services: Vec<Cow<'static, str>>,
}

impl Default for DefaultEndpointResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultEndpointResolver {
    pub fn new() -> Self {
        DefaultEndpointResolver {
            dns_suffix: Cow::Borrowed(DEFAULT_DNS_SUFFIX),
            known_services: vec![Cow::Borrowed("s3")],
        }
    }

    /// Use a different DNS suffix, eg. for private or direct endpoints
    pub fn dns_suffix(mut self, dns_suffix: impl Into<Cow<'static, str>>) -> Self {
        self.dns_suffix = dns_suffix.into();
        self
    }

    /// Register a service that resolves even without `resolve_unknown_service`
    pub fn known_service(mut self, service: impl Into<Cow<'static, str>>) -> Self {
        self.known_services.push(service.into());
        self
    }

    fn is_known(&self, service: &str) -> bool {
        self.known_services.iter().any(|known| known == service)
    }
}

impl ResolveEndpoint for DefaultEndpointResolver {
    fn endpoint_for(
        &self,
        service: &str,
        region: Option<&Region>,
        options: &EndpointOptions,
    ) -> Result<ResolvedEndpoint, EndpointError> {
        let region = match region {
            Some(region) if !region.as_ref().is_empty() => region,
            _ => {
                return Err(EndpointError::MissingRegion {
                    service: service.to_string(),
                })
            }
        };
        if !self.is_known(service) && !options.resolve_unknown_service {
            return Err(EndpointError::UnknownService {
                service: service.to_string(),
                region: region.to_string(),
            });
        }
        let template = if options.use_dual_stack {
            DUAL_STACK_HOSTNAME_TEMPLATE
        } else {
            HOSTNAME_TEMPLATE
        };
        let hostname = template
            .replace("{service}", service)
            .replace("{region}", region.as_ref())
            .replace("{dnsSuffix}", &self.dns_suffix);
        let resolved = ResolvedEndpoint {
            url: add_scheme(&hostname, options.disable_ssl),
            signing_region: Some(SigningRegion::from(region.clone())),
            signing_name: Some(SigningService::new(service.to_string())),
            signing_name_derived: true,
        };
        tracing::debug!(service = %service, region = %region, url = %resolved.url, "resolved endpoint");
        Ok(resolved)
    }
}

/// Endpoint resolver backed by a closure
///
/// ```rust
/// use cos_endpoint::{resolver_fn, ResolvedEndpoint};
/// let resolver = resolver_fn(|_service, _region, _options| {
///     Ok(ResolvedEndpoint {
///         url: "https://s3.private.us-south.cloud-object-storage.appdomain.cloud".to_string(),
///         ..Default::default()
///     })
/// });
/// ```
pub fn resolver_fn<F>(f: F) -> ResolverFn<F>
where
    F: Fn(&str, Option<&Region>, &EndpointOptions) -> Result<ResolvedEndpoint, EndpointError>
        + Send
        + Sync,
{
    ResolverFn { f }
}

/// See [`resolver_fn`]
#[derive(Copy, Clone)]
pub struct ResolverFn<F> {
    f: F,
}

impl<F> Debug for ResolverFn<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ResolverFn")
    }
}

impl<F> ResolveEndpoint for ResolverFn<F>
where
    F: Fn(&str, Option<&Region>, &EndpointOptions) -> Result<ResolvedEndpoint, EndpointError>
        + Send
        + Sync,
{
    fn endpoint_for(
        &self,
        service: &str,
        region: Option<&Region>,
        options: &EndpointOptions,
    ) -> Result<ResolvedEndpoint, EndpointError> {
        (self.f)(service, region, options)
    }
}
