/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use cos_types::os_shim_internal::Env;

pub(crate) const DEFAULT_PROFILE: &str = "default";

/// HMAC keys from the environment or a profile
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct StaticKeys {
    pub(crate) access_key_id: String,
    pub(crate) secret_access_key: String,
    pub(crate) session_token: Option<String>,
}

impl StaticKeys {
    /// `None` unless both the access key and the secret are set
    pub(crate) fn from_parts(
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        session_token: Option<String>,
    ) -> Option<Self> {
        match (access_key_id, secret_access_key) {
            (Some(access_key_id), Some(secret_access_key))
                if !access_key_id.is_empty() && !secret_access_key.is_empty() =>
            {
                Some(StaticKeys {
                    access_key_id,
                    secret_access_key,
                    session_token: session_token.filter(|token| !token.is_empty()),
                })
            }
            _ => None,
        }
    }
}

/// Session settings read from environment variables
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EnvConfig {
    pub(crate) keys: Option<StaticKeys>,
    pub(crate) region: Option<String>,
    pub(crate) profile: String,
    pub(crate) enable_shared_config: bool,
    pub(crate) custom_ca_bundle: Option<String>,
}

impl EnvConfig {
    /// Shared config enabled by `AWS_SDK_LOAD_CONFIG`
    pub(crate) fn load(env: &Env) -> Self {
        let shared = env
            .get("AWS_SDK_LOAD_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        Self::load_with(env, shared)
    }

    /// Shared config enabled whatever `AWS_SDK_LOAD_CONFIG` says
    pub(crate) fn load_shared(env: &Env) -> Self {
        Self::load_with(env, true)
    }

    /// Shared config disabled whatever `AWS_SDK_LOAD_CONFIG` says
    pub(crate) fn load_unshared(env: &Env) -> Self {
        Self::load_with(env, false)
    }

    /// `AWS_DEFAULT_REGION` and `AWS_DEFAULT_PROFILE` are fallbacks only with shared config
    fn load_with(env: &Env, shared: bool) -> Self {
        let (region_keys, profile_keys): (&[&str], &[&str]) = if shared {
            (
                &["AWS_REGION", "AWS_DEFAULT_REGION"],
                &["AWS_PROFILE", "AWS_DEFAULT_PROFILE"],
            )
        } else {
            (&["AWS_REGION"], &["AWS_PROFILE"])
        };
        EnvConfig {
            keys: StaticKeys::from_parts(
                env.first_non_empty(&["AWS_ACCESS_KEY_ID", "AWS_ACCESS_KEY"]),
                env.first_non_empty(&["AWS_SECRET_ACCESS_KEY", "AWS_SECRET_KEY"]),
                env.first_non_empty(&["AWS_SESSION_TOKEN"]),
            ),
            region: env.first_non_empty(region_keys),
            profile: env
                .first_non_empty(profile_keys)
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            enable_shared_config: shared,
            custom_ca_bundle: env.first_non_empty(&["AWS_CA_BUNDLE"]),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => true,
        "" | "0" | "f" | "F" | "false" | "FALSE" | "False" => false,
        other => {
            tracing::warn!(value = %other, "AWS_SDK_LOAD_CONFIG is not a boolean, shared config stays disabled");
            false
        }
    }
}
