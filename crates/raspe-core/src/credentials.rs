//! API key resolution.

use crate::error::{RaspeError, Result};

/// Resolve a credential from an explicit value or an environment variable.
///
/// The explicit value wins. Blank values count as missing.
///
/// # Errors
/// Returns [`RaspeError::Credential`] when neither source yields a key.
pub fn resolve_api_key(name: &str, explicit: Option<&str>, env_var: &str) -> Result<String> {
    resolve_with(name, explicit, env_var, |key| std::env::var(key).ok())
}

pub(crate) fn resolve_with(
    name: &str,
    explicit: Option<&str>,
    env_var: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    match lookup(env_var).map(|k| k.trim().to_string()) {
        Some(key) if !key.is_empty() => {
            tracing::debug!(credential = name, env_var, "Credential resolved from environment");
            Ok(key)
        }
        _ => Err(RaspeError::Credential {
            name: name.to_string(),
            env_var: env_var.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_wins() {
        let key = resolve_with("api_key", Some("abc"), "X_KEY", |_| Some("env".into())).unwrap();
        assert_eq!(key, "abc");
    }

    #[test]
    fn test_env_fallback() {
        let key = resolve_with("api_key", None, "X_KEY", |k| {
            (k == "X_KEY").then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(key, "from-env");
    }

    #[test]
    fn test_missing_everywhere() {
        let err = resolve_with("api_key", Some("  "), "X_KEY", |_| None).unwrap_err();
        assert!(matches!(err, RaspeError::Credential { .. }));
    }
}
