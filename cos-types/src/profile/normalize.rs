/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::profile::parse::RawProfileSet;
use crate::profile::source::ProfileFileKind;
use crate::profile::{Profile, ProfileSet, Property};

/// Merge the profiles of one raw file into `base`
///
/// - Config file sections must start with `profile ` (`profile foo` => `foo`), except `default`
/// - `[profile default]` takes priority over `[default]` in a config file
/// - Profile names and property keys must be valid identifiers, invalid ones are skipped
/// - Properties already in `base` are overwritten by the same key in this file
pub(super) fn normalize(
    mut base: ProfileSet,
    raw_profile: RawProfileSet<'_>,
    kind: ProfileFileKind,
) -> ProfileSet {
    let prefixed_default_present = kind == ProfileFileKind::Config
        && raw_profile
            .keys()
            .any(|name| name.strip_prefix("profile ").map(str::trim) == Some("default"));
    for (profile_name, raw_profile) in raw_profile {
        let normalized_profile_name = match (profile_name, kind) {
            (any, ProfileFileKind::Credentials) => any,
            ("default", ProfileFileKind::Config) if prefixed_default_present => {
                tracing::warn!("profile `default` ignored because `[profile default]` was found which takes priority");
                continue;
            }
            ("default", ProfileFileKind::Config) => "default",
            (other, ProfileFileKind::Config) => match other.strip_prefix("profile ") {
                Some(name) => name.trim(),
                None => {
                    tracing::warn!(profile = %other, "profile ignored: in config files, profiles MUST start with `profile `");
                    continue;
                }
            },
        };
        let normalized_name = match validate_identifier(normalized_profile_name) {
            Some(name) => name,
            None => {
                tracing::warn!(name = ?normalized_profile_name, "profile ignored because `{}` was not a valid identifier", normalized_profile_name);
                continue;
            }
        };
        let profile = base
            .profiles
            .entry(normalized_name.to_string())
            .or_insert_with(|| Profile::new(normalized_name.to_owned(), Default::default()));
        for (k, v) in raw_profile {
            match validate_identifier(k) {
                Some(k) => {
                    profile
                        .properties
                        .insert(k.to_owned(), Property::new(k.to_owned(), v.into()));
                }
                None => {
                    tracing::warn!(profile = %normalized_name, key = ?k, "key ignored because `{}` was not a valid identifier", k);
                }
            }
        }
    }
    base
}

/// Identifiers must match `[A-Za-z0-9_\-/.%@:+]+`
fn validate_identifier(input: &str) -> Option<&str> {
    (!input.is_empty()
        && input.chars().all(|ch| {
            ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '/' | '.' | '%' | '@' | ':' | '+')
        }))
    .then(|| input)
}
