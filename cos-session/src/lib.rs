/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Sessions for the IBM Cloud Object Storage SDK
//!
//! A [`Session`] resolves region and credentials once, from explicit settings, environment
//! variables and the shared `~/.aws/config` and `~/.aws/credentials` files, and hands every
//! service client a [`ClientConfig`] with its endpoint resolved.
//!
//! ```no_run
//! use cos_session::{Config, Session};
//! use cos_types::Region;
//! let session = Session::new(Config::builder().region(Region::new("us-south")).build())
//!     .expect("valid session");
//! let client_config = session.client_config("s3", &[]).expect("endpoint resolves");
//! assert_eq!(client_config.endpoint, "https://s3.us-south.cloud-object-storage.appdomain.cloud");
//! ```

pub mod config;
mod env_config;
pub mod error;
pub mod handlers;
pub mod session;
mod shared_config;

pub use config::Config;
pub use error::SessionError;
pub use session::{ClientConfig, Options, Session, SharedConfigState};
