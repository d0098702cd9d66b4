/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Request authentication for IBM Cloud Object Storage
//!
//! IAM credentials are sent as a bearer token. HMAC credentials are signed with SigV4 by an
//! injected [`SignRequest`](signer::SignRequest) implementation.

pub mod middleware;
pub mod signer;
