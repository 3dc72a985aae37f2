//! Credentials for the remote services
//!
//! Both credentials come from the environment only:
//! 1. JULES_API_KEY - required for every session operation
//! 2. GITHUB_TOKEN - required to read pull request review comments

use jules_core::{JulesError, Result};
use std::env;

pub const JULES_API_KEY_ENV: &str = "JULES_API_KEY";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Get the Jules API key
pub fn jules_api_key() -> Result<String> {
    required_var(
        JULES_API_KEY_ENV,
        "No Jules API key found. Set JULES_API_KEY (create one under Settings at https://jules.google.com)",
    )
}

/// Get the GitHub token used for review comment reads
pub fn github_token() -> Result<String> {
    required_var(
        GITHUB_TOKEN_ENV,
        "No GitHub token found. Set GITHUB_TOKEN to a token with read access to pull requests",
    )
}

fn required_var(key: &str, message: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            tracing::debug!("Using {}", key);
            Ok(value)
        }
        _ => Err(JulesError::Configuration(message.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to prevent concurrent env var modifications
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap();

        let originals: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();

        for (key, value) in vars {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        let result = f();

        for (key, original) in originals {
            match original {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        result
    }

    #[test]
    fn test_jules_key_present() {
        with_env_vars(&[(JULES_API_KEY_ENV, Some("test-key"))], || {
            assert_eq!(jules_api_key().unwrap(), "test-key");
        });
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        with_env_vars(&[(JULES_API_KEY_ENV, None)], || {
            let err = jules_api_key().unwrap_err();
            assert!(matches!(err, JulesError::Configuration(_)));
        });
    }

    #[test]
    fn test_blank_token_rejected() {
        with_env_vars(&[(GITHUB_TOKEN_ENV, Some("   "))], || {
            assert!(github_token().is_err());
        });
    }
}
