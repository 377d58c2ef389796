//! API key resolution.
//!
//! A key may be configured inline, as a file path (container secrets) or as
//! the name of an environment variable. The first non-empty source wins, in
//! that order.

use std::path::PathBuf;

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Secret file '{path}' is empty")]
    EmptyFile { path: PathBuf },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from the first configured source.
///
/// Empty strings count as "not configured". File contents and env values are
/// trimmed.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = non_empty(direct) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = non_empty(file_path) {
        return read_file(expand_home(path));
    }

    if let Some(name) = non_empty(env_var) {
        return read_env(name);
    }

    Err(SecretError::NoSourceProvided)
}

/// Like [`resolve_secret`], but no configured source yields `None`.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn read_file(path: PathBuf) -> Result<SecretString> {
    let content = std::fs::read_to_string(&path).map_err(|e| SecretError::FileRead {
        path: path.clone(),
        source: e,
    })?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(SecretError::EmptyFile { path });
    }
    log::debug!("Resolved secret from file {}", path.display());
    Ok(SecretString::from(trimmed.to_string()))
}

fn read_env(name: &str) -> Result<SecretString> {
    match std::env::var(name) {
        Ok(value) => {
            log::debug!("Resolved secret from env var {}", name);
            Ok(SecretString::from(value.trim().to_string()))
        }
        Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
            name: name.to_string(),
        }),
        Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
            name: name.to_string(),
        }),
    }
}

/// Expands a leading `~` or `~/`. `~user` forms are left alone.
fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => Some(""),
        Some(rest) => rest.strip_prefix('/'),
        None => None,
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
