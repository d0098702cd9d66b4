/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::env_config::StaticKeys;
use crate::error::SessionError;
use cos_types::os_shim_internal::{Env, Fs};
use cos_types::profile::{self, Profile, ProfileFiles, ProfileSet};
use std::time::Duration;

mod keys {
    pub(super) const REGION: &str = "region";
    pub(super) const ACCESS_KEY_ID: &str = "aws_access_key_id";
    pub(super) const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
    pub(super) const SESSION_TOKEN: &str = "aws_session_token";
    pub(super) const ROLE_ARN: &str = "role_arn";
    pub(super) const SOURCE_PROFILE: &str = "source_profile";
    pub(super) const CREDENTIAL_SOURCE: &str = "credential_source";
    pub(super) const EXTERNAL_ID: &str = "external_id";
    pub(super) const MFA_SERIAL: &str = "mfa_serial";
    pub(super) const ROLE_SESSION_NAME: &str = "role_session_name";
    pub(super) const DURATION_SECONDS: &str = "duration_seconds";
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct AssumeRoleConfig {
    pub(crate) role_arn: Option<String>,
    pub(crate) source_profile: Option<String>,
    pub(crate) credential_source: Option<String>,
    pub(crate) external_id: Option<String>,
    pub(crate) mfa_serial: Option<String>,
    pub(crate) role_session_name: Option<String>,
    pub(crate) duration: Option<Duration>,
}

/// The selected profile, merged across every loaded file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SharedConfig {
    pub(crate) profile: String,
    pub(crate) region: Option<String>,
    pub(crate) keys: Option<StaticKeys>,
    pub(crate) assume_role: AssumeRoleConfig,

    /// Keys of `source_profile`, resolved when the profile assumes a role
    pub(crate) assume_role_source: Option<StaticKeys>,
}

/// Load `profile` from `files`
///
/// Later files override earlier ones. Missing files and a missing profile give an empty
/// config; a file that cannot be parsed is an error.
pub(crate) fn load(
    fs: &Fs,
    env: &Env,
    profile: &str,
    files: &ProfileFiles,
) -> Result<SharedConfig, SessionError> {
    let profiles = profile::load(fs, env, files, Some(profile)).map_err(|err| {
        SessionError::SharedConfigLoad {
            path: err.path().to_string(),
            source: err,
        }
    })?;
    from_profiles(&profiles, profile)
}

fn from_profiles(profiles: &ProfileSet, name: &str) -> Result<SharedConfig, SessionError> {
    let profile = match profiles.get_profile(name) {
        Some(profile) => profile,
        None => {
            tracing::debug!(profile = %name, "profile not found in the shared files");
            return Ok(SharedConfig {
                profile: name.to_string(),
                ..Default::default()
            });
        }
    };
    let mut config = SharedConfig {
        profile: name.to_string(),
        region: value(profile, keys::REGION),
        keys: static_keys(profile),
        assume_role: assume_role(profile),
        assume_role_source: None,
    };
    if let (Some(role_arn), Some(source_profile)) = (
        config.assume_role.role_arn.as_ref(),
        config.assume_role.source_profile.as_ref(),
    ) {
        let source = profiles.get_profile(source_profile).and_then(static_keys);
        match source {
            Some(keys) => config.assume_role_source = Some(keys),
            None => {
                return Err(SessionError::SharedConfigAssumeRole {
                    role_arn: role_arn.clone(),
                })
            }
        }
    }
    Ok(config)
}

fn value(profile: &Profile, key: &str) -> Option<String> {
    profile.get_non_empty(key).map(str::to_string)
}

fn static_keys(profile: &Profile) -> Option<StaticKeys> {
    StaticKeys::from_parts(
        value(profile, keys::ACCESS_KEY_ID),
        value(profile, keys::SECRET_ACCESS_KEY),
        value(profile, keys::SESSION_TOKEN),
    )
}

fn assume_role(profile: &Profile) -> AssumeRoleConfig {
    let duration = value(profile, keys::DURATION_SECONDS).and_then(|seconds| {
        match seconds.parse::<u64>() {
            Ok(seconds) => Some(Duration::from_secs(seconds)),
            Err(_) => {
                tracing::warn!(profile = %profile.name(), value = %seconds, "ignoring invalid duration_seconds");
                None
            }
        }
    });
    AssumeRoleConfig {
        role_arn: value(profile, keys::ROLE_ARN),
        source_profile: value(profile, keys::SOURCE_PROFILE),
        credential_source: value(profile, keys::CREDENTIAL_SOURCE),
        external_id: value(profile, keys::EXTERNAL_ID),
        mfa_serial: value(profile, keys::MFA_SERIAL),
        role_session_name: value(profile, keys::ROLE_SESSION_NAME),
        duration,
    }
}
