use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HysealError, HysealResult};

/// Top-level configuration (loaded from hyseal.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HysealConfig {
    pub crypto: CryptoConfig,
    pub keys: KeysConfig,
    pub log: LogConfig,
}

/// Container parameters. Encryptor and decryptor must agree on these:
/// the container carries no version or algorithm identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// AES session key length in bytes: 16, 24 or 32 (default: 16)
    pub session_key_length: usize,
    /// EAX nonce length in bytes (default: 16)
    pub nonce_length: usize,
    /// EAX tag length in bytes, 4..=16 (default: 16)
    pub tag_length: usize,
    /// Streaming window in bytes (default: 1024). Does not affect the wire format.
    pub chunk_size: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            session_key_length: 16,
            nonce_length: 16,
            tag_length: 16,
            chunk_size: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Private key PEM used by `decrypt` and written by `keygen`
    pub private_key: Option<PathBuf>,
    /// Public key PEM used by `encrypt` and written by `keygen`
    pub public_key: Option<PathBuf>,
    /// RSA modulus size for newly generated key pairs (default: 2048)
    pub key_bits: usize,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            public_key: None,
            key_bits: 2048,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl HysealConfig {
    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> HysealResult<Self> {
        let path = expand_tilde(path);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| HysealError::Config(format!("parsing {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

/// Expand `~` in path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[crypto]
session_key_length = 32
nonce_length = 16
tag_length = 12
chunk_size = 65536

[keys]
private_key = "/home/user/.config/hyseal/private.pem"
public_key = "/home/user/.config/hyseal/public.pem"
key_bits = 4096

[log]
level = "debug"
format = "json"
"#;
        let config: HysealConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.crypto.session_key_length, 32);
        assert_eq!(config.crypto.tag_length, 12);
        assert_eq!(config.crypto.chunk_size, 65536);
        assert_eq!(
            config.keys.private_key,
            Some(PathBuf::from("/home/user/.config/hyseal/private.pem"))
        );
        assert_eq!(config.keys.key_bits, 4096);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config: HysealConfig = toml::from_str("").unwrap();

        assert_eq!(config.crypto.session_key_length, 16);
        assert_eq!(config.crypto.nonce_length, 16);
        assert_eq!(config.crypto.tag_length, 16);
        assert_eq!(config.crypto.chunk_size, 1024);
        assert!(config.keys.private_key.is_none());
        assert!(config.keys.public_key.is_none());
        assert_eq!(config.keys.key_bits, 2048);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[crypto]
chunk_size = 4096
"#;
        let config: HysealConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.crypto.chunk_size, 4096);
        // Defaults
        assert_eq!(config.crypto.session_key_length, 16);
        assert_eq!(config.crypto.tag_length, 16);
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = HysealConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: HysealConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.crypto.chunk_size, parsed.crypto.chunk_size);
        assert_eq!(config.keys.key_bits, parsed.keys.key_bits);
        assert_eq!(config.log.level, parsed.log.level);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = HysealConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.crypto.chunk_size, 1024);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("hyseal.toml");
        std::fs::write(&path, "[crypto]\ntag_length = 8\n").unwrap();

        let config = HysealConfig::load(&path).unwrap();
        assert_eq!(config.crypto.tag_length, 8);
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.toml");
        std::fs::write(&path, "[crypto\nchunk_size = ").unwrap();

        let err = HysealConfig::load(&path).unwrap_err();
        assert!(matches!(err, HysealError::Config(_)));
    }

    #[test]
    fn test_expand_tilde_leaves_absolute_paths() {
        let p = Path::new("/etc/hyseal/config.toml");
        assert_eq!(expand_tilde(p), PathBuf::from("/etc/hyseal/config.toml"));
    }
}
