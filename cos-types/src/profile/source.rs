/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::os_shim_internal::{Env, Fs};
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// The kind of a shared profile file
///
/// Config files require the `profile ` prefix on every section except `default`. Credentials files
/// use bare profile names.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProfileFileKind {
    Config,
    Credentials,
}

impl ProfileFileKind {
    pub fn default_path(&self) -> &'static str {
        match self {
            ProfileFileKind::Config => "~/.aws/config",
            ProfileFileKind::Credentials => "~/.aws/credentials",
        }
    }

    pub fn override_environment_variable(&self) -> &'static str {
        match self {
            ProfileFileKind::Config => "AWS_CONFIG_FILE",
            ProfileFileKind::Credentials => "AWS_SHARED_CREDENTIALS_FILE",
        }
    }
}

/// One profile file to load
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ProfileFile {
    /// The default location for `kind`, overridable by environment variable
    Default(ProfileFileKind),

    /// An explicit path. A leading `~` is expanded to the home directory.
    FilePath { kind: ProfileFileKind, path: PathBuf },

    /// In-memory contents
    FileContents {
        kind: ProfileFileKind,
        contents: String,
    },
}

impl ProfileFile {
    pub fn kind(&self) -> ProfileFileKind {
        match self {
            ProfileFile::Default(kind) => *kind,
            ProfileFile::FilePath { kind, .. } | ProfileFile::FileContents { kind, .. } => *kind,
        }
    }
}

/// An ordered list of profile files
///
/// When several files define the same property of the same profile, the later file wins.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfileFiles {
    files: Vec<ProfileFile>,
}

impl Default for ProfileFiles {
    /// The default config file followed by the default credentials file
    fn default() -> Self {
        ProfileFiles {
            files: vec![
                ProfileFile::Default(ProfileFileKind::Config),
                ProfileFile::Default(ProfileFileKind::Credentials),
            ],
        }
    }
}

impl ProfileFiles {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Only the default credentials file
    pub fn credentials_only() -> Self {
        ProfileFiles {
            files: vec![ProfileFile::Default(ProfileFileKind::Credentials)],
        }
    }

    pub fn files(&self) -> &[ProfileFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl From<Vec<ProfileFile>> for ProfileFiles {
    fn from(files: Vec<ProfileFile>) -> Self {
        ProfileFiles { files }
    }
}

/// Builder for [`ProfileFiles`]
///
/// ```rust
/// use cos_types::profile::{ProfileFileKind, ProfileFiles};
/// let files = ProfileFiles::builder()
///     .include_default_credentials_file(true)
///     .with_file(ProfileFileKind::Config, "/etc/cos/config")
///     .build();
/// assert_eq!(files.files().len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Builder {
    files: Vec<ProfileFile>,
}

impl Builder {
    pub fn include_default_config_file(mut self, include: bool) -> Self {
        if include {
            self.files.push(ProfileFile::Default(ProfileFileKind::Config));
        }
        self
    }

    pub fn include_default_credentials_file(mut self, include: bool) -> Self {
        if include {
            self.files
                .push(ProfileFile::Default(ProfileFileKind::Credentials));
        }
        self
    }

    pub fn with_file(mut self, kind: ProfileFileKind, path: impl Into<PathBuf>) -> Self {
        self.files.push(ProfileFile::FilePath {
            kind,
            path: path.into(),
        });
        self
    }

    pub fn with_contents(mut self, kind: ProfileFileKind, contents: impl Into<String>) -> Self {
        self.files.push(ProfileFile::FileContents {
            kind,
            contents: contents.into(),
        });
        self
    }

    pub fn build(self) -> ProfileFiles {
        ProfileFiles { files: self.files }
    }
}

/// In-memory profile file
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct File {
    pub kind: ProfileFileKind,
    /// Expanded path, `None` for in-memory contents
    pub path: Option<String>,
    pub contents: String,
}

/// A profile file that had to exist could not be read
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ReadError {
    NotFound { path: String },
    Unreadable { path: String, message: String },
}

impl Display for ReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::NotFound { path } => write!(f, "profile file {} not found", path),
            ReadError::Unreadable { path, message } => {
                write!(f, "failed to read profile file {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for ReadError {}

/// Load every file of `files`
///
/// Missing or unreadable files are logged and treated as empty.
pub fn load(env: &Env, fs: &Fs, files: &ProfileFiles) -> Vec<File> {
    files
        .files
        .iter()
        .map(|file| {
            tracing::info_span!("load_profile_file", kind = ?file.kind())
                .in_scope(|| read_lenient(env, fs, file))
        })
        .collect()
}

fn read_lenient(env: &Env, fs: &Fs, file: &ProfileFile) -> File {
    match read_required(env, fs, file) {
        Ok(file) => file,
        Err(ReadError::NotFound { path }) => {
            match file {
                ProfileFile::Default(kind) if env.get(kind.override_environment_variable()).is_ok() => {
                    tracing::warn!(path = %path, env = %kind.override_environment_variable(), "config file overridden via environment variable not found")
                }
                ProfileFile::Default(_) => tracing::info!(path = %path, "config file not found"),
                _ => tracing::warn!(path = %path, "config file not found"),
            }
            File {
                kind: file.kind(),
                path: Some(path),
                contents: String::new(),
            }
        }
        Err(ReadError::Unreadable { path, message }) => {
            tracing::warn!(path = %path, error = %message, "failed to read config file");
            File {
                kind: file.kind(),
                path: Some(path),
                contents: String::new(),
            }
        }
    }
}

/// Read a single file, failing when it does not exist
pub fn read_required(env: &Env, fs: &Fs, file: &ProfileFile) -> Result<File, ReadError> {
    let (kind, path) = match file {
        ProfileFile::FileContents { kind, contents } => {
            return Ok(File {
                kind: *kind,
                path: None,
                contents: contents.clone(),
            })
        }
        ProfileFile::Default(kind) => (
            *kind,
            env.get(kind.override_environment_variable())
                .map(Cow::Owned)
                .unwrap_or_else(|_| kind.default_path().into()),
        ),
        ProfileFile::FilePath { kind, path } => (*kind, path.to_string_lossy()),
    };
    let expanded = expand_home(path.as_ref(), env, Os::real());
    tracing::debug!(before = ?path, after = ?expanded, "home directory expanded");
    // lossy is OK here, the name of this file is only used for diagnostics
    let display_path: String = expanded.to_string_lossy().into();
    let contents = fs.read_to_string(&expanded).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ReadError::NotFound {
            path: display_path.clone(),
        },
        _ => ReadError::Unreadable {
            path: display_path.clone(),
            message: err.to_string(),
        },
    })?;
    tracing::info!(path = %display_path, size = ?contents.len(), "config file loaded");
    Ok(File {
        kind,
        path: Some(display_path),
        contents,
    })
}

fn expand_home(path: impl AsRef<Path>, env: &Env, os: Os) -> PathBuf {
    let path = path.as_ref();
    let mut components = path.components();
    match components.next() {
        None => path.into(),
        Some(Component::Normal(s)) if s == "~" => {
            let mut path = match home_dir(env, os) {
                Some(dir) => {
                    tracing::debug!(home = ?dir, "performing home directory substitution");
                    dir
                }
                None => {
                    tracing::warn!(
                        "could not determine home directory but home expansion was requested"
                    );
                    Default::default()
                }
            };
            // rewrite the rest with platform separators
            for component in components {
                path.push(component);
            }
            path
        }
        // paths from the environment already use the platform's separators
        _other => path.into(),
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Os {
    Windows,
    NotWindows,
}

impl Os {
    fn real() -> Self {
        match std::env::consts::OS {
            "windows" => Os::Windows,
            _ => Os::NotWindows,
        }
    }
}

fn home_dir(env: &Env, os: Os) -> Option<PathBuf> {
    if let Ok(home) = env.get("HOME") {
        tracing::debug!(src = "HOME", "loaded home directory");
        return Some(PathBuf::from(home));
    }

    if os == Os::Windows {
        if let Ok(home) = env.get("USERPROFILE") {
            tracing::debug!(src = "USERPROFILE", "loaded home directory");
            return Some(PathBuf::from(home));
        }

        if let (Ok(mut drive), Ok(path)) = (env.get("HOMEDRIVE"), env.get("HOMEPATH")) {
            tracing::debug!(src = "HOMEDRIVE/HOMEPATH", "loaded home directory");
            drive.push_str(&path);
            return Some(drive.into());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{expand_home, load, read_required, Os, ProfileFile, ProfileFileKind, ProfileFiles, ReadError};
    use crate::os_shim_internal::{Env, Fs};
    use tracing_test::traced_test;

    #[test]
    fn only_expand_home_prefix() {
        let env = Env::from_slice(&[("HOME", "/user/foo")]);
        assert_eq!(
            expand_home("~aws/config", &env, Os::NotWindows)
                .to_str()
                .unwrap(),
            "~aws/config"
        );
    }

    #[test]
    #[cfg(not(windows))]
    fn expands_home() {
        let env = Env::from_slice(&[("HOME", "/user/foo")]);
        assert_eq!(
            expand_home("~/.aws/config", &env, Os::NotWindows)
                .to_str()
                .unwrap(),
            "/user/foo/.aws/config"
        );
    }

    #[test]
    #[cfg(windows)]
    fn expands_home_windows() {
        let env = Env::from_slice(&[("HOMEDRIVE", "C:"), ("HOMEPATH", "\\Users\\name")]);
        assert_eq!(
            expand_home("~/.aws/config", &env, Os::Windows)
                .to_str()
                .unwrap(),
            "C:\\Users\\name\\.aws\\config"
        );
    }

    #[traced_test]
    #[test]
    #[cfg(not(windows))]
    fn default_files_follow_environment_overrides() {
        let env = Env::from_slice(&[
            ("HOME", "/user/name"),
            ("AWS_SHARED_CREDENTIALS_FILE", "/etc/cos/credentials"),
        ]);
        let fs = Fs::from_slice(&[
            ("/user/name/.aws/config", "[default]\nregion = us-south"),
            ("/etc/cos/credentials", "[default]\nibm_api_key_id = key"),
        ]);
        let files = load(&env, &fs, &ProfileFiles::default());
        assert_eq!(files[0].path.as_deref(), Some("/user/name/.aws/config"));
        assert_eq!(files[0].kind, ProfileFileKind::Config);
        assert_eq!(files[1].path.as_deref(), Some("/etc/cos/credentials"));
        assert!(files[1].contents.contains("ibm_api_key_id"));
        assert!(logs_contain("config file loaded"));
        assert!(logs_contain("performing home directory substitution"));
    }

    #[traced_test]
    #[test]
    fn missing_files_are_empty() {
        let env = Env::from_slice(&[("HOME", "/user/name")]);
        let fs = Fs::from_slice(&[]);
        let files = load(&env, &fs, &ProfileFiles::credentials_only());
        assert_eq!(files.len(), 1);
        assert!(files[0].contents.is_empty());
        assert!(logs_contain("config file not found"));
    }

    #[test]
    fn required_file_must_exist() {
        let env = Env::from_slice(&[]);
        let fs = Fs::from_slice(&[]);
        let err = read_required(
            &env,
            &fs,
            &ProfileFile::FilePath {
                kind: ProfileFileKind::Credentials,
                path: "/nowhere/credentials".into(),
            },
        )
        .expect_err("file does not exist");
        assert_eq!(
            err,
            ReadError::NotFound {
                path: "/nowhere/credentials".into()
            }
        );
    }

    #[test]
    fn in_memory_contents_have_no_path() {
        let file = read_required(
            &Env::from_slice(&[]),
            &Fs::from_slice(&[]),
            &ProfileFile::FileContents {
                kind: ProfileFileKind::Config,
                contents: "[default]".into(),
            },
        )
        .expect("in memory");
        assert_eq!(file.path, None);
        assert_eq!(file.contents, "[default]");
    }
}
