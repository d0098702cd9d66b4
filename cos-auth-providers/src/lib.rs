/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credentials providers for the IBM Cloud Object Storage SDK
//!
//! - [`ibm`]: IAM token providers (API key, trusted profile, custom token source)
//! - [`static_keys`]: HMAC keys from code, the environment or a profile
//! - [`assume_role`]: role credentials obtained from an injected role assumer
//! - [`chain`]: tries several providers in order
//! - [`diagnostic`]: always fails, explaining why no credentials were found

pub mod assume_role;
pub mod chain;
pub mod diagnostic;
pub mod ibm;
pub mod provider_config;
pub mod static_keys;
