//! API key resolution.
//!
//! Keys come from an explicit override, the process environment, or a
//! `.env` file. The `.env` file is parsed into a local map; the process
//! environment is only ever read.

use crate::error::{Result, TryOnError};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variables checked for a key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Default name of the dotenv file searched for.
pub const DOTENV_FILE: &str = ".env";

/// A Gemini API key. `Debug` never prints the full value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw key for use in request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the key with everything but the first and last four
    /// characters hidden.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Where a resolved key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Passed explicitly (e.g. `--api-key`).
    Explicit,
    /// Read from a process environment variable.
    Environment(&'static str),
    /// Read from a dotenv file.
    DotEnv {
        /// File the key was found in.
        path: PathBuf,
        /// Variable name inside the file.
        var: &'static str,
    },
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit override"),
            Self::Environment(var) => write!(f, "environment variable {var}"),
            Self::DotEnv { path, var } => write!(f, "{var} in {}", path.display()),
        }
    }
}

/// A key together with its origin.
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    /// The key itself.
    pub key: ApiKey,
    /// Where it was found.
    pub source: KeySource,
}

/// Inputs to key resolution.
#[derive(Debug, Clone, Default)]
pub struct CredentialOptions {
    /// Key supplied directly; wins over every other source.
    pub explicit: Option<String>,
    /// Dotenv file to read. When unset, `.env` is searched for from the
    /// working directory upwards and skipped if none exists.
    pub env_file: Option<PathBuf>,
    /// Let dotenv values replace variables already set in the environment.
    pub env_override: bool,
}

impl CredentialOptions {
    /// Resolves a key using the real process environment and working
    /// directory.
    pub fn resolve(&self) -> Result<ResolvedKey> {
        let cwd = std::env::current_dir()?;
        self.resolve_with(&cwd, |name| std::env::var(name).ok())
    }

    /// Resolves a key with an injected environment lookup.
    ///
    /// Precedence is explicit, then environment, then dotenv; with
    /// `env_override` the dotenv file is consulted before the environment.
    pub fn resolve_with<F>(&self, cwd: &Path, lookup: F) -> Result<ResolvedKey>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = non_empty(self.explicit.clone()) {
            return Ok(ResolvedKey {
                key: ApiKey::new(key),
                source: KeySource::Explicit,
            });
        }

        let from_env = || {
            API_KEY_ENV_VARS.iter().find_map(|&var| {
                non_empty(lookup(var)).map(|key| ResolvedKey {
                    key: ApiKey::new(key),
                    source: KeySource::Environment(var),
                })
            })
        };

        // The dotenv file is only read when it can change the outcome.
        let resolved = if self.env_override {
            match self.from_dotenv(cwd)? {
                Some(resolved) => Some(resolved),
                None => from_env(),
            }
        } else {
            match from_env() {
                Some(resolved) => Some(resolved),
                None => self.from_dotenv(cwd)?,
            }
        };

        if let Some(ref r) = resolved {
            tracing::debug!(source = %r.source, "resolved API key");
        }

        resolved.ok_or_else(|| {
            TryOnError::Config(format!(
                "missing API key: set {} in the environment or a {} file, or pass --api-key",
                API_KEY_ENV_VARS.join(" or "),
                DOTENV_FILE
            ))
        })
    }

    fn from_dotenv(&self, cwd: &Path) -> Result<Option<ResolvedKey>> {
        let Some((path, vars)) = self.load_dotenv(cwd)? else {
            return Ok(None);
        };
        Ok(API_KEY_ENV_VARS.iter().find_map(|&var| {
            non_empty(vars.get(var).cloned()).map(|key| ResolvedKey {
                key: ApiKey::new(key),
                source: KeySource::DotEnv {
                    path: path.clone(),
                    var,
                },
            })
        }))
    }

    fn load_dotenv(&self, cwd: &Path) -> Result<Option<(PathBuf, HashMap<String, String>)>> {
        let path = match self.env_file {
            Some(ref explicit) => {
                let path = if explicit.is_absolute() {
                    explicit.clone()
                } else {
                    cwd.join(explicit)
                };
                if !path.is_file() {
                    return Err(TryOnError::Config(format!(
                        "env file not found: {}",
                        path.display()
                    )));
                }
                path
            }
            None => match find_dotenv(cwd) {
                Some(path) => path,
                None => return Ok(None),
            },
        };

        let vars = parse_dotenv(&path)?;
        tracing::debug!(path = %path.display(), entries = vars.len(), "loaded dotenv file");
        Ok(Some((path, vars)))
    }
}

/// Searches `start` and its ancestors for a `.env` file.
pub fn find_dotenv(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(DOTENV_FILE))
        .find(|candidate| candidate.is_file())
}

/// Parses a dotenv file into a map without touching the process environment.
///
/// Lines that are not valid `KEY=value` entries are skipped with a warning.
pub fn parse_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| {
        TryOnError::Config(format!("failed to read {}: {e}", path.display()))
    })?;

    let mut vars = HashMap::new();
    for item in iter {
        match item {
            Ok((key, value)) => {
                vars.insert(key, value);
            }
            Err(dotenvy::Error::LineParse(line, _)) => {
                tracing::warn!(path = %path.display(), "skipping unparseable line: {line}");
            }
            Err(e) => {
                return Err(TryOnError::Config(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        }
    }
    Ok(vars)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_env(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(DOTENV_FILE);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_explicit_key_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_env(dir.path(), "GOOGLE_API_KEY=from-file\n");
        let options = CredentialOptions {
            explicit: Some("from-flag".into()),
            ..Default::default()
        };

        let resolved = options
            .resolve_with(dir.path(), |_| Some("from-env".into()))
            .unwrap();
        assert_eq!(resolved.key.expose(), "from-flag");
        assert_eq!(resolved.source, KeySource::Explicit);
    }

    #[test]
    fn test_environment_beats_dotenv_by_default() {
        let dir = tempfile::tempdir().unwrap();
        write_env(dir.path(), "GOOGLE_API_KEY=from-file\n");

        let resolved = CredentialOptions::default()
            .resolve_with(dir.path(), |name| {
                (name == "GEMINI_API_KEY").then(|| "from-env".to_string())
            })
            .unwrap();
        assert_eq!(resolved.key.expose(), "from-env");
        assert_eq!(resolved.source, KeySource::Environment("GEMINI_API_KEY"));
    }

    #[test]
    fn test_env_override_prefers_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env(dir.path(), "# comment\nGEMINI_API_KEY=\"from-file\"\n");
        let options = CredentialOptions {
            env_override: true,
            ..Default::default()
        };

        let resolved = options
            .resolve_with(dir.path(), |_| Some("from-env".into()))
            .unwrap();
        assert_eq!(resolved.key.expose(), "from-file");
        assert_eq!(
            resolved.source,
            KeySource::DotEnv {
                path,
                var: "GEMINI_API_KEY"
            }
        );
    }

    #[test]
    fn test_google_key_checked_before_gemini_key() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = CredentialOptions::default()
            .resolve_with(dir.path(), |name| Some(format!("{name}-value")))
            .unwrap();
        assert_eq!(resolved.key.expose(), "GOOGLE_API_KEY-value");
    }

    #[test]
    fn test_dotenv_found_in_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_env(dir.path(), "GOOGLE_API_KEY=parent-key\n");
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let resolved = CredentialOptions::default()
            .resolve_with(&nested, no_env)
            .unwrap();
        assert_eq!(resolved.key.expose(), "parent-key");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.env");
        std::fs::write(&empty, "").unwrap();
        let options = CredentialOptions {
            env_file: Some(empty),
            ..Default::default()
        };
        let err = options
            .resolve_with(dir.path(), |_| Some("   ".into()))
            .unwrap_err();
        assert!(matches!(err, TryOnError::Config(_)));
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_explicit_env_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let options = CredentialOptions {
            env_file: Some("missing.env".into()),
            ..Default::default()
        };
        let err = options.resolve_with(dir.path(), no_env).unwrap_err();
        assert!(err.to_string().contains("env file not found"));
    }

    #[test]
    fn test_environment_key_ignores_malformed_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        write_env(
            dir.path(),
            "# notes\nthis line has no equals\nGREETING=hello world\nGOOGLE_API_KEY=file\n",
        );

        let resolved = CredentialOptions::default()
            .resolve_with(dir.path(), |name| {
                (name == "GOOGLE_API_KEY").then(|| "env-key".to_string())
            })
            .unwrap();
        assert_eq!(resolved.key.expose(), "env-key");
        assert_eq!(resolved.source, KeySource::Environment("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_malformed_dotenv_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env(
            dir.path(),
            "this line has no equals\nGREETING=hello world\nGEMINI_API_KEY=from-file\n",
        );

        let vars = parse_dotenv(&path).unwrap();
        assert_eq!(vars.get("GEMINI_API_KEY").map(String::as_str), Some("from-file"));

        let resolved = CredentialOptions::default()
            .resolve_with(dir.path(), no_env)
            .unwrap();
        assert_eq!(resolved.key.expose(), "from-file");
    }

    #[test]
    fn test_masked_key() {
        assert_eq!(ApiKey::new("AIzaSyExample1234").masked(), "AIza...1234");
        assert_eq!(ApiKey::new("short").masked(), "*****");
        assert!(!format!("{:?}", ApiKey::new("AIzaSyExample1234")).contains("Example"));
    }
}
