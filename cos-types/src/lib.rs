/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Types shared by the credential, session and endpoint crates of the IBM Cloud Object Storage SDK.

pub mod credential;
#[doc(hidden)]
pub mod os_shim_internal;
pub mod profile;
pub mod region;
pub mod time;

pub use credential::{Credentials, ProviderType, Token};
pub use region::{Region, SigningRegion, SigningService};
