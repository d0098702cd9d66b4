/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! IBM Cloud Object Storage credentials
//!
//! Requests are authenticated either with an IAM bearer [`Token`] (API keys, trusted profiles,
//! custom token sources) or with an HMAC key pair. Both are carried by [`Credentials`].
//!
//! ## Implementing your own credentials provider
//!
//! Define an inherent `async fn` on your structure, then call it from the trait
//! implementation:
//! ```rust
//! use cos_types::credential::{CredentialsError, provide_credentials, Credentials};
//! use cos_types::credential::provide_credentials::future::ProvideCredentials;
//!
//! #[derive(Debug)]
//! struct SubprocessCredentialProvider;
//!
//! async fn invoke_command(command: &str) -> String {
//!     // implementation elided...
//!     # String::from("some credentials")
//! }
//!
//! /// Parse access key and secret from the first two lines of a string
//! fn parse_credentials(creds: &str) -> provide_credentials::Result {
//!     let mut lines = creds.lines();
//!     let akid = lines.next().ok_or(CredentialsError::provider_error("invalid credentials"))?;
//!     let secret = lines.next().ok_or(CredentialsError::provider_error("invalid credentials"))?;
//!     Ok(Credentials::from_keys(akid, secret, None, "CustomCommand"))
//! }
//!
//! impl SubprocessCredentialProvider {
//!     async fn load_credentials(&self) -> provide_credentials::Result {
//!         let creds = invoke_command("load-credentials.py").await;
//!         parse_credentials(&creds)
//!     }
//! }
//!
//! impl provide_credentials::ProvideCredentials for SubprocessCredentialProvider {
//!     fn provide_credentials<'a>(&'a self) -> ProvideCredentials<'a> where Self: 'a {
//!         ProvideCredentials::new(self.load_credentials())
//!     }
//!
//!     fn is_expired(&self) -> bool {
//!         true
//!     }
//! }
//! ```

pub mod credentials;
pub mod provide_credentials;
pub mod token;

pub use credentials::{Credentials, ProviderType};
pub use provide_credentials::{
    CredentialsError, ProvideCredentials, ProviderBuildError, Result, SharedCredentialsProvider,
};
pub use token::Token;
