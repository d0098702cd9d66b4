/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use cos_endpoint::EndpointError;
use cos_types::profile::ProfileParseError;
use std::error::Error;
use thiserror::Error;

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Code shared by the errors of the shared config logic
pub const ERR_CODE_SHARED_CONFIG: &str = "SharedConfigErr";

/// A session or a client configuration could not be created
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The selected profile sets both `source_profile` and `credential_source`
    #[error("only source profile or credential source can be specified, not both")]
    SharedConfigSourceCollision,

    #[error("credential source values must be EcsContainer, Ec2InstanceMetadata, or Environment")]
    SharedConfigInvalidCredSource,

    #[error("assume role with MFA enabled, but AssumeRoleTokenProvider session option not set.")]
    AssumeRoleTokenProviderNotSet,

    #[error("profile assumes role {role_arn}, but no role assumer was set in the session options")]
    RoleAssumerNotSet { role_arn: String },

    #[error("failed to load assume role for {role_arn}, source profile has no shared credentials")]
    SharedConfigAssumeRole { role_arn: String },

    #[error("failed to load config file, {path}")]
    SharedConfigLoad {
        path: String,
        #[source]
        source: ProfileParseError,
    },

    #[error("{message}")]
    LoadCustomCaBundle {
        message: &'static str,
        #[source]
        source: Option<BoxError>,
    },

    #[error("failed to resolve endpoint")]
    Endpoint(#[from] EndpointError),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::SharedConfigSourceCollision
            | SessionError::SharedConfigInvalidCredSource => ERR_CODE_SHARED_CONFIG,
            SessionError::AssumeRoleTokenProviderNotSet => "AssumeRoleTokenProviderNotSetError",
            SessionError::RoleAssumerNotSet { .. } => "RoleAssumerNotSetError",
            SessionError::SharedConfigAssumeRole { .. } => "SharedConfigAssumeRoleError",
            SessionError::SharedConfigLoad { .. } => "SharedConfigLoadError",
            SessionError::LoadCustomCaBundle { .. } => "LoadCustomCABundleError",
            SessionError::Endpoint(err) => err.code(),
        }
    }

    pub(crate) fn ca_bundle(message: &'static str, source: impl Into<BoxError>) -> Self {
        SessionError::LoadCustomCaBundle {
            message,
            source: Some(source.into()),
        }
    }
}
