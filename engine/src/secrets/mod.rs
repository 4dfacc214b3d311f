pub mod string;

pub use string::SecretString;

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

/// Keychain key for the Workers AI API token
pub const WORKERS_AI_TOKEN_KEY: &str = "workers_ai_token";

/// Environment variable that overrides the keychain token
pub const WORKERS_AI_TOKEN_ENV: &str = "WAYFARER_WORKERS_AI_TOKEN";

/// SecretManager handles storage and retrieval of API tokens using the OS keychain.
///
/// Secrets are stored in:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service (libsecret)
///
/// Unlike an interactive setup flow, a missing secret is an error here; use
/// `wayfarer secret set` to store one.
pub struct SecretManager {
    service_name: String,
}

/// Regex patterns for detecting token formats in provider error bodies.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Initializes and returns the secret detection patterns.
///
/// Patterns match:
/// - Bearer tokens: Bearer\s+[^\s]{20,}
/// - Authorization headers echoed back by proxies
/// - Long opaque API tokens following `token=` or `key=`
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"Bearer\s+[^\s]{20,}",
            r#"(?i)authorization:\s*[^\s"]{20,}"#,
            r"(?i)(token|key)=[A-Za-z0-9\-_]{20,}",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Scrubs secrets from text by replacing them with [REDACTED].
///
/// Applied to inference error text before it is logged or shown, since some
/// gateways echo request headers back in their error bodies.
///
/// # Examples
/// ```
/// use wayfarer_engine::secrets::scrub;
///
/// let scrubbed = scrub("rejected Bearer abcdefghijklmnopqrstuvwxyz0123");
/// assert_eq!(scrubbed, "rejected [REDACTED]");
/// ```
pub fn scrub(text: &str) -> String {
    let mut result = text.to_string();

    for pattern in get_secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }

    result
}

impl SecretManager {
    /// Creates a new SecretManager with the given service name.
    ///
    /// The service name is used to namespace secrets in the OS keychain.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Retrieves a secret from the OS keychain.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if the secret is missing or keychain access fails
    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })?;

        match entry.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(SecretString::new(secret))
            }
            Err(keyring::Error::NoEntry) => Err(EngineError::KeyringError(format!(
                "Secret '{}' not found. Run 'wayfarer secret set {} <value>'",
                key, key
            ))),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Stores a secret in the OS keychain.
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        if value.trim().is_empty() {
            return Err(EngineError::KeyringError(
                "Secret cannot be empty".to_string(),
            ));
        }

        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })?;

        entry.set_password(value).map_err(|e| {
            EngineError::KeyringError(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    /// Checks if a secret exists in the OS keychain.
    pub fn has_secret(&self, key: &str) -> bool {
        let entry = match Entry::new(&self.service_name, key) {
            Ok(entry) => entry,
            Err(_) => return false,
        };

        entry.get_password().is_ok()
    }

    /// Resolve a secret, preferring an environment variable over the keychain.
    pub fn resolve(&self, env_var: &str, key: &str) -> Result<SecretString, EngineError> {
        match std::env::var(env_var) {
            Ok(value) if !value.trim().is_empty() => {
                tracing::debug!("Using secret '{}' from ${}", key, env_var);
                Ok(SecretString::new(value))
            }
            _ => self.get_secret(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_manager_creation() {
        let manager = SecretManager::new("test-service");
        assert_eq!(manager.service_name, "test-service");
    }

    #[test]
    fn test_empty_secret_rejected() {
        let manager = SecretManager::new("wayfarer-test");
        let result = manager.set_secret("test_key", "   ");
        assert!(matches!(result, Err(EngineError::KeyringError(_))));
    }

    #[test]
    fn test_resolve_prefers_env() {
        let var = "WAYFARER_TEST_TOKEN_RESOLVE";
        std::env::set_var(var, "from-env");
        let manager = SecretManager::new("wayfarer-test");
        let secret = manager.resolve(var, "unused_key").unwrap();
        assert_eq!(secret.unsecure(), "from-env");
        std::env::remove_var(var);
    }

    #[test]
    fn test_has_secret_returns_false_for_nonexistent() {
        let manager = SecretManager::new("wayfarer_test_has_secret");
        assert!(!manager.has_secret("nonexistent_key"));
    }

    #[test]
    fn test_scrub_bearer_token() {
        let text = "Authorization failed: Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        assert_eq!(scrub(text), "Authorization failed: [REDACTED]");
    }

    #[test]
    fn test_scrub_authorization_header() {
        let text = r#"{"echo":"authorization: abcdefghijklmnopqrstuvwxyz"}"#;
        assert_eq!(scrub(text), r#"{"echo":"[REDACTED]"}"#);
    }

    #[test]
    fn test_scrub_query_token() {
        let text = "GET /run?token=ABCDEFGHIJKLMNOPQRSTUVWXYZ123456 failed";
        assert_eq!(scrub(text), "GET /run?[REDACTED] failed");
    }

    #[test]
    fn test_scrub_no_secrets() {
        let text = "Workers AI returned 500: internal error";
        assert_eq!(scrub(text), text);
    }

    #[test]
    fn test_scrub_short_values_untouched() {
        let text = "token=short";
        assert_eq!(scrub(text), text);
    }
}
