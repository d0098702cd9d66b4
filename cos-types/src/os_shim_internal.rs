/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Abstractions for testing code that interacts with the operating system:
//! - Reading environment variables
//! - Reading from the file system
//!
//! Every provider reads the process environment and the shared profile files through these shims
//! so tests can run in parallel without touching the real process state.

use std::collections::HashMap;
use std::env::VarError;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

/// File system abstraction
///
/// Construct a file system which delegates to `std::fs`:
/// ```rust
/// let fs = cos_types::os_shim_internal::Fs::real();
/// ```
///
/// Construct an in-memory file system for testing:
/// ```rust
/// use std::collections::HashMap;
/// let fs = cos_types::os_shim_internal::Fs::from_map({
///     let mut map = HashMap::new();
///     map.insert("/home/.bluemix/cos_credentials".to_string(), "[default]\nibm_api_key_id = key".into());
///     map
/// });
/// ```
#[derive(Clone, Debug)]
pub struct Fs(Arc<fs::Inner>);

impl Default for Fs {
    fn default() -> Self {
        Fs::real()
    }
}

impl Fs {
    pub fn real() -> Self {
        Fs(Arc::new(fs::Inner::Real))
    }

    pub fn from_raw_map(fs: HashMap<OsString, Vec<u8>>) -> Self {
        Fs(Arc::new(fs::Inner::Fake { fs }))
    }

    pub fn from_map(data: HashMap<String, Vec<u8>>) -> Self {
        let fs = data.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::from_raw_map(fs)
    }

    /// Create an in-memory file system from `(path, contents)` pairs
    ///
    /// ```rust
    /// use cos_types::os_shim_internal::Fs;
    /// let fs = Fs::from_slice(&[("/var/run/secrets/tokens/cr-token", "token")]);
    /// assert_eq!(fs.read_to_string("/var/run/secrets/tokens/cr-token").unwrap(), "token");
    /// ```
    pub fn from_slice<'a>(files: &[(&'a str, &'a str)]) -> Self {
        Self::from_map(
            files
                .iter()
                .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                .collect(),
        )
    }

    pub fn read_to_end(&self, path: impl AsRef<Path>) -> std::io::Result<Vec<u8>> {
        use fs::Inner;
        let path = path.as_ref();
        match &self.0.as_ref() {
            Inner::Real => std::fs::read(path),
            Inner::Fake { fs } => fs
                .get(path.as_os_str())
                .cloned()
                .ok_or_else(|| std::io::ErrorKind::NotFound.into()),
        }
    }

    /// Read a UTF-8 file, failing with `InvalidData` when the contents are not valid UTF-8
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> std::io::Result<String> {
        let bytes = self.read_to_end(path)?;
        String::from_utf8(bytes)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}

mod fs {
    use std::collections::HashMap;
    use std::ffi::OsString;

    #[derive(Debug)]
    pub enum Inner {
        Real,
        Fake {
            fs: HashMap<OsString, Vec<u8>>,
        },
    }
}

/// Environment variable abstraction
///
/// Environment variables are global to a process, and, as such, are difficult to test with a multi-
/// threaded test runner like Rust's. This enables loading environment variables either from the
/// actual process environment ([`std::env::var`](std::env::var)) or from a hash map.
#[derive(Clone, Debug)]
pub struct Env(Arc<env::Inner>);

impl Default for Env {
    fn default() -> Self {
        Self::real()
    }
}

impl Env {
    pub fn get(&self, k: &str) -> Result<String, VarError> {
        use env::Inner;
        match &self.0.as_ref() {
            Inner::Real => std::env::var(k),
            Inner::Fake(map) => map.get(k).cloned().ok_or(VarError::NotPresent),
        }
    }

    /// Returns the value of the first variable in `keys` that is set to a non-empty value
    ///
    /// Several settings accept more than one name (`AWS_ACCESS_KEY_ID` and `AWS_ACCESS_KEY`
    /// for example); the earlier name wins.
    pub fn first_non_empty(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.get(key).ok())
            .find(|value| !value.is_empty())
    }

    /// Create a fake process environment from a slice of tuples.
    ///
    /// # Example
    /// ```rust
    /// use cos_types::os_shim_internal::Env;
    /// let mock_env = Env::from_slice(&[
    ///     ("HOME", "/home/myname"),
    ///     ("IBM_API_KEY_ID", "my-api-key")
    /// ]);
    /// assert_eq!(mock_env.get("HOME").unwrap(), "/home/myname");
    /// ```
    pub fn from_slice<'a>(vars: &[(&'a str, &'a str)]) -> Self {
        use env::Inner;
        Self(Arc::new(Inner::Fake(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )))
    }

    /// Create a process environment that uses the real process environment
    ///
    /// Calls will be delegated to [`std::env::var`](std::env::var).
    pub fn real() -> Self {
        Self(Arc::new(env::Inner::Real))
    }
}

impl From<HashMap<String, String>> for Env {
    fn from(hash_map: HashMap<String, String>) -> Self {
        Self(Arc::new(env::Inner::Fake(hash_map)))
    }
}

mod env {
    use std::collections::HashMap;

    #[derive(Debug)]
    pub enum Inner {
        Real,
        Fake(HashMap<String, String>),
    }
}
