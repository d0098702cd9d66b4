/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Shared config and credentials files
//!
//! Profiles are loaded from an ordered list of [`ProfileFiles`]. By default that is
//! `~/.aws/config` followed by `~/.aws/credentials`, each overridable through `AWS_CONFIG_FILE`
//! and `AWS_SHARED_CREDENTIALS_FILE`.

mod normalize;
mod parse;
pub mod source;

use crate::os_shim_internal::{Env, Fs};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

pub use parse::ProfileParseError;
pub use source::{ProfileFile, ProfileFileKind, ProfileFiles};

/// Profile files could not be turned into a [`ProfileSet`]
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ProfileFileError {
    /// A file that had to exist could not be read
    Read(source::ReadError),
    /// A file was read but is not a valid profile file
    Parse(ProfileParseError),
}

impl Display for ProfileFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProfileFileError::Read(err) => write!(f, "{}", err),
            ProfileFileError::Parse(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ProfileFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProfileFileError::Read(err) => Some(err),
            ProfileFileError::Parse(err) => Some(err),
        }
    }
}

impl From<ProfileParseError> for ProfileFileError {
    fn from(err: ProfileParseError) -> Self {
        ProfileFileError::Parse(err)
    }
}

impl From<source::ReadError> for ProfileFileError {
    fn from(err: source::ReadError) -> Self {
        ProfileFileError::Read(err)
    }
}

/// Load and merge every file of `files`
///
/// Missing files are treated as empty. The selected profile is `selected_profile` when set,
/// otherwise `AWS_PROFILE`, otherwise `default`.
///
/// ```rust
/// use cos_types::os_shim_internal::{Env, Fs};
/// use cos_types::profile::{self, ProfileFileKind, ProfileFiles};
/// let files = ProfileFiles::builder()
///     .with_contents(ProfileFileKind::Credentials, "[default]\nibm_api_key_id = key")
///     .build();
/// let set = profile::load(&Fs::from_slice(&[]), &Env::from_slice(&[]), &files, None).unwrap();
/// assert_eq!(set.get("ibm_api_key_id"), Some("key"));
/// ```
pub fn load(
    fs: &Fs,
    env: &Env,
    files: &ProfileFiles,
    selected_profile: Option<&str>,
) -> Result<ProfileSet, ProfileParseError> {
    let mut set = ProfileSet::empty();
    set.selected_profile = select_profile(env, selected_profile);
    for file in source::load(env, fs, files) {
        let raw = parse::parse_profile_file(&file)?;
        set = normalize::normalize(set, raw, file.kind);
    }
    Ok(set)
}

/// Load a single file that must exist
pub fn load_required(
    fs: &Fs,
    env: &Env,
    file: &ProfileFile,
    selected_profile: Option<&str>,
) -> Result<ProfileSet, ProfileFileError> {
    let file = source::read_required(env, fs, file)?;
    let raw = parse::parse_profile_file(&file)?;
    let mut set = normalize::normalize(ProfileSet::empty(), raw, file.kind);
    set.selected_profile = select_profile(env, selected_profile);
    Ok(set)
}

fn select_profile(env: &Env, selected_profile: Option<&str>) -> Cow<'static, str> {
    match selected_profile {
        Some(profile) => Cow::Owned(profile.to_string()),
        None => env
            .get("AWS_PROFILE")
            .ok()
            .filter(|profile| !profile.is_empty())
            .map(Cow::Owned)
            .unwrap_or(Cow::Borrowed("default")),
    }
}

/// A set of named profiles with one of them selected
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfileSet {
    profiles: HashMap<String, Profile>,
    selected_profile: Cow<'static, str>,
}

impl ProfileSet {
    /// An empty set with `default` selected
    pub fn empty() -> Self {
        ProfileSet {
            profiles: Default::default(),
            selected_profile: "default".into(),
        }
    }

    /// Property `key` of the selected profile
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_profile(self.selected_profile())
            .and_then(|profile| profile.get(key))
    }

    pub fn get_profile(&self, profile_name: &str) -> Option<&Profile> {
        self.profiles.get(profile_name)
    }

    pub fn selected_profile(&self) -> &str {
        self.selected_profile.as_ref()
    }

    /// Select a different profile of the same set
    pub fn with_selected_profile(mut self, profile_name: impl Into<String>) -> Self {
        self.selected_profile = Cow::Owned(profile_name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

/// A named profile and its properties
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Profile {
    name: String,
    properties: HashMap<String, Property>,
}

impl Profile {
    pub fn new(name: String, properties: HashMap<String, Property>) -> Self {
        Self { name, properties }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(|prop| prop.value())
    }

    /// Property `name` when it is present and not empty
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Key-value pair defined in a profile
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Property {
    key: String,
    value: String,
}

impl Property {
    pub fn new(key: String, value: String) -> Self {
        Property { key, value }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}
