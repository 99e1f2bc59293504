//! API key resolution, sanitization and masking.

use crate::config::ConfigStore;
use std::ffi::OsString;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Environment variable that overrides the configured key.
pub const API_KEY_ENV_VAR: &str = "PERPLEXITY_API_KEY";

/// A sanitized, non-empty API key that is safe to send as a header value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Sanitize `raw` and wrap it, or `None` if nothing usable is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = sanitize(raw);
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key with its middle redacted.
    pub fn masked(&self) -> String {
        mask(&self.0)
    }
}

// Keep the secret out of debug output and logs.
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    ConfigFile,
}

impl KeySource {
    /// Sources in precedence order.
    pub const PRECEDENCE: [KeySource; 2] = [KeySource::Environment, KeySource::ConfigFile];

    pub fn describe(&self) -> String {
        match self {
            KeySource::Environment => format!("environment variable {}", API_KEY_ENV_VAR),
            KeySource::ConfigFile => "config file".to_string(),
        }
    }
}

#[derive(Debug, Error)]
#[error(
    "Perplexity API key not configured. Run 'pplx configure' to set it up \
     or set the PERPLEXITY_API_KEY environment variable."
)]
pub struct NoCredentialError;

/// Resolves the API key from the environment and the config store.
pub struct Resolver<'a> {
    env_value: Option<String>,
    store: &'a ConfigStore,
}

impl<'a> Resolver<'a> {
    /// A resolver reading `PERPLEXITY_API_KEY` from the process environment.
    pub fn from_env(store: &'a ConfigStore) -> Self {
        Self {
            env_value: env_value(std::env::var_os(API_KEY_ENV_VAR)),
            store,
        }
    }

    /// A resolver with an explicit environment value.
    pub fn new(env_value: Option<String>, store: &'a ConfigStore) -> Self {
        Self { env_value, store }
    }

    /// Resolve the key, reporting which source supplied it.
    pub fn resolve_with_source(&self) -> Result<(ApiKey, KeySource), NoCredentialError> {
        for source in KeySource::PRECEDENCE {
            let candidate = match source {
                KeySource::Environment => self.env_value.as_deref().and_then(ApiKey::parse),
                KeySource::ConfigFile => ApiKey::parse(&self.store.load().api_key),
            };
            if let Some(key) = candidate {
                debug!("Using API key from {}", source.describe());
                return Ok((key, source));
            }
        }
        Err(NoCredentialError)
    }

    pub fn resolve(&self) -> Result<ApiKey, NoCredentialError> {
        self.resolve_with_source().map(|(key, _)| key)
    }
}

/// Decode an environment value. Invalid UTF-8 is replaced rather than
/// discarded so sanitization still sees the usable characters.
fn env_value(raw: Option<OsString>) -> Option<String> {
    raw.map(|v| v.to_string_lossy().into_owned())
}

/// Resolve the API key for this process.
pub fn resolve_api_key(store: &ConfigStore) -> Result<ApiKey, NoCredentialError> {
    Resolver::from_env(store).resolve()
}

/// Drop everything outside printable ASCII and trim surrounding whitespace.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| matches!(c, ' '..='~'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Redact a secret for display.
///
/// Keys of up to 9 characters are fully masked; longer keys keep the first 5
/// and last 4 characters.
pub fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let len = chars.len();
    if len <= 9 {
        return "*".repeat(len);
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[len - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(len - 9), tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn store_with_key(dir: &TempDir, key: &str) -> ConfigStore {
        let store = ConfigStore::at(dir.path().join("config.json"));
        store
            .save(&Config {
                api_key: key.to_string(),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_mask_short_keys_fully() {
        for key in ["", "a", "abc123", "123456789"] {
            let masked = mask(key);
            assert_eq!(masked.len(), key.len());
            assert!(masked.chars().all(|c| c == '*'));
        }
    }

    #[test]
    fn test_mask_long_keys() {
        assert_eq!(mask("0123456789"), "01234*6789");
        assert_eq!(mask("pplx-abcdefghijklmnop"), "pplx-************mnop");

        let key = "pplx-1234567890abcdef";
        let masked = mask(key);
        assert_eq!(masked.len(), key.len());
        assert_eq!(&masked[..5], &key[..5]);
        assert_eq!(&masked[masked.len() - 4..], &key[key.len() - 4..]);
        assert!(masked[5..masked.len() - 4].chars().all(|c| c == '*'));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("pplx-abc"), "pplx-abc");
        assert_eq!(sanitize("  pplx-abc\n"), "pplx-abc");
        assert_eq!(sanitize("pplx\u{200b}-ab\tc"), "pplx-abc");
        assert_eq!(sanitize("clé"), "cl");
        assert_eq!(sanitize(" \r\n "), "");
    }

    #[test]
    fn test_api_key_rejects_empty() {
        assert!(ApiKey::parse("").is_none());
        assert!(ApiKey::parse("\u{feff}\n").is_none());
        assert_eq!(ApiKey::parse("abc123").unwrap().as_str(), "abc123");
    }

    #[test]
    fn test_api_key_debug_is_masked() {
        let key = ApiKey::parse("pplx-secretsecret").unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains("secretsecret"));
        assert!(debug.contains("pplx-"));
    }

    #[test]
    fn test_env_wins_over_config() {
        let dir = TempDir::new().unwrap();
        let store = store_with_key(&dir, "from-config");

        let resolver = Resolver::new(Some("from-env".to_string()), &store);
        let (key, source) = resolver.resolve_with_source().unwrap();
        assert_eq!(key.as_str(), "from-env");
        assert_eq!(source, KeySource::Environment);
    }

    #[test]
    fn test_config_used_when_env_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_with_key(&dir, "abc123");

        for env in [None, Some(String::new()), Some("\u{00e9}\n".to_string())] {
            let resolver = Resolver::new(env, &store);
            let (key, source) = resolver.resolve_with_source().unwrap();
            assert_eq!(key.as_str(), "abc123");
            assert_eq!(source, KeySource::ConfigFile);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_env_value_with_invalid_utf8_still_wins() {
        use std::os::unix::ffi::OsStringExt;

        let dir = TempDir::new().unwrap();
        let store = store_with_key(&dir, "from-config");

        let raw = OsString::from_vec(b"pplx-envkey\xff".to_vec());
        let resolver = Resolver::new(env_value(Some(raw)), &store);
        let (key, source) = resolver.resolve_with_source().unwrap();
        assert_eq!(key.as_str(), "pplx-envkey");
        assert_eq!(source, KeySource::Environment);
    }

    #[test]
    fn test_no_credential() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::at(dir.path().join("config.json"));

        let err = Resolver::new(None, &store).resolve().unwrap_err();
        assert!(err.to_string().contains("pplx configure"));
        // Resolution still leaves a default config behind.
        assert!(store.path().exists());
    }
}
