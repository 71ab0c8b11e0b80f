//! Field-level encryption under a time-windowed key.
//!
//! The key for a window is Argon2id(passphrase, salt), where the salt is the
//! first 16 bytes of SHA-256 over the domain tag, the configured context and
//! the window label. Values are sealed with AES-256-GCM under a fresh random
//! 96-bit nonce; the window label is bound as associated data.
//!
//! All values sealed in the same window and context share a key. The window is
//! never used as a nonce.

use crate::error::{Result, SanitizeError};
use crate::policy::{CryptoSettings, WindowGranularity};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;

/// Envelope version written into ciphertext tokens.
pub const ENVELOPE_VERSION: &str = "v1";

/// Domain tag mixed into every salt.
const SALT_DOMAIN: &str = "ps-sanitize/v1";

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Window label for an instant: `YYYYMMDDHH` or `YYYYMMDD`, in UTC.
pub fn window_label(granularity: WindowGranularity, at: DateTime<Utc>) -> String {
    match granularity {
        WindowGranularity::Hourly => at.format("%Y%m%d%H").to_string(),
        WindowGranularity::Daily => at.format("%Y%m%d").to_string(),
    }
}

/// Placeholder used when encryption is disabled or fails.
pub fn redacted_placeholder(field: &str) -> String {
    format!("{}:REDACTED", field)
}

fn derive_salt(context: &str, window: &str) -> [u8; SALT_LEN] {
    let digest = Sha256::digest(format!("{}|{}|{}", SALT_DOMAIN, context, window).as_bytes());
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&digest[..SALT_LEN]);
    salt
}

fn associated_data(window: &str) -> String {
    format!("{}|{}", ENVELOPE_VERSION, window)
}

/// Windowed field encryptor.
///
/// Built once from the policy's crypto settings. Holds the passphrase, never a
/// derived key: keys are derived per call through [`FieldEncryptor::window_key`].
#[derive(Clone)]
pub struct FieldEncryptor {
    settings: CryptoSettings,
    passphrase: Option<String>,
    params: Params,
}

impl fmt::Debug for FieldEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldEncryptor")
            .field("enabled", &self.settings.enabled)
            .field("window", &self.settings.window)
            .field("context", &self.settings.context)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl FieldEncryptor {
    /// Create an encryptor.
    ///
    /// Fails with [`SanitizeError::MissingPassphrase`] when encryption is
    /// enabled and the passphrase is absent or empty.
    pub fn new(settings: &CryptoSettings, passphrase: Option<String>) -> Result<Self> {
        let passphrase = passphrase.filter(|p| !p.is_empty());
        if settings.enabled && passphrase.is_none() {
            return Err(SanitizeError::MissingPassphrase);
        }

        let params = Params::new(
            settings.kdf.memory_kib,
            settings.kdf.iterations,
            settings.kdf.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| SanitizeError::Key(format!("invalid argon2 parameters: {}", e)))?;

        Ok(Self {
            settings: settings.clone(),
            passphrase,
            params,
        })
    }

    /// Create an encryptor reading the passphrase from the configured env var.
    pub fn from_env(settings: &CryptoSettings) -> Result<Self> {
        Self::new(settings, settings.passphrase_from_env())
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled && self.passphrase.is_some()
    }

    pub fn settings(&self) -> &CryptoSettings {
        &self.settings
    }

    /// Derive the key for the window containing `at`.
    pub fn window_key(&self, at: DateTime<Utc>) -> Result<WindowKey> {
        self.key_for_window(&window_label(self.settings.window, at))
    }

    /// Derive the key for an explicit window label.
    pub fn key_for_window(&self, window: &str) -> Result<WindowKey> {
        let passphrase = match (&self.passphrase, self.settings.enabled) {
            (Some(p), true) => p,
            _ => return Err(SanitizeError::MissingPassphrase),
        };

        let salt = derive_salt(&self.settings.context, window);
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let mut key = [0u8; KEY_LEN];
        argon
            .hash_password_into(passphrase.as_bytes(), &salt, &mut key)
            .map_err(|e| SanitizeError::Key(format!("key derivation failed: {}", e)))?;

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| SanitizeError::Key(format!("invalid key length: {}", e)))?;

        Ok(WindowKey {
            window: window.to_string(),
            template: self.settings.template.clone(),
            cipher,
        })
    }

    /// Encrypt one value under the current window's key.
    ///
    /// Disabled encryptors return the redacted placeholder. Sanitizing a whole
    /// tree should derive one [`WindowKey`] and reuse it instead.
    pub fn encrypt(&self, field: &str, plaintext: &str) -> Result<String> {
        if !self.is_enabled() {
            return Ok(redacted_placeholder(field));
        }
        self.window_key(Utc::now())?.seal(field, plaintext)
    }

    /// Recover the plaintext of a token produced with the default envelope.
    ///
    /// Accepts either the bare `ENC[...]` envelope or a full rendered value
    /// such as `nome:ENC[v1|2024031514|...|...]`.
    pub fn decrypt(&self, token: &str) -> Result<String> {
        let envelope = Envelope::parse(token)?;
        self.key_for_window(&envelope.window)?.open(&envelope)
    }
}

/// A derived key for one window.
pub struct WindowKey {
    window: String,
    template: String,
    cipher: Aes256Gcm,
}

impl fmt::Debug for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowKey")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl WindowKey {
    pub fn window(&self) -> &str {
        &self.window
    }

    /// Encrypt `plaintext` and render it through the output template.
    pub fn seal(&self, field: &str, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| SanitizeError::Crypto(format!("failed to generate nonce: {}", e)))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aad = associated_data(&self.window);
        let ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|_| SanitizeError::Crypto("encryption failed".to_string()))?;

        Ok(render_template(
            &self.template,
            field,
            &self.window,
            &URL_SAFE_NO_PAD.encode(nonce_bytes),
            &URL_SAFE_NO_PAD.encode(ciphertext),
        ))
    }

    fn open(&self, envelope: &Envelope) -> Result<String> {
        if envelope.window != self.window {
            return Err(SanitizeError::Crypto("window mismatch".to_string()));
        }
        let aad = associated_data(&self.window);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(&envelope.nonce),
                Payload {
                    msg: &envelope.ciphertext,
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|_| SanitizeError::Crypto("authentication failed".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|_| SanitizeError::Crypto("plaintext is not UTF-8".to_string()))
    }
}

/// Render the output template in a single pass.
///
/// Placeholder-like text inside the substituted values is not expanded again.
fn render_template(template: &str, field: &str, window: &str, nonce: &str, ciphertext: &str) -> String {
    let mut out = String::with_capacity(template.len() + field.len() + ciphertext.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open..];
        let replaced = [
            ("{field}", field),
            ("{window}", window),
            ("{nonce}", nonce),
            ("{ciphertext}", ciphertext),
        ]
        .iter()
        .find(|(name, _)| after.starts_with(name))
        .map(|(name, value)| (name.len(), *value));

        match replaced {
            Some((len, value)) => {
                out.push_str(value);
                rest = &after[len..];
            }
            None => {
                out.push('{');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parsed `ENC[v1|window|nonce|ciphertext]` envelope.
#[derive(Debug)]
struct Envelope {
    window: String,
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
}

impl Envelope {
    fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        let start = token
            .rfind("ENC[")
            .ok_or_else(|| SanitizeError::Crypto("no ENC[...] envelope found".to_string()))?;
        let inner = token[start + "ENC[".len()..]
            .strip_suffix(']')
            .ok_or_else(|| SanitizeError::Crypto("unterminated envelope".to_string()))?;

        let parts: Vec<&str> = inner.split('|').collect();
        let [version, window, nonce, ciphertext] = parts.as_slice() else {
            return Err(SanitizeError::Crypto(format!(
                "envelope has {} fields, expected 4",
                parts.len()
            )));
        };
        if *version != ENVELOPE_VERSION {
            return Err(SanitizeError::Crypto(format!(
                "unsupported envelope version '{}'",
                version
            )));
        }

        let nonce = URL_SAFE_NO_PAD
            .decode(nonce)
            .map_err(|e| SanitizeError::Crypto(format!("invalid nonce encoding: {}", e)))?;
        if nonce.len() != NONCE_LEN {
            return Err(SanitizeError::Crypto(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce.len()
            )));
        }
        let ciphertext = URL_SAFE_NO_PAD
            .decode(ciphertext)
            .map_err(|e| SanitizeError::Crypto(format!("invalid ciphertext encoding: {}", e)))?;

        Ok(Self {
            window: window.to_string(),
            nonce,
            ciphertext,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::KdfParams;
    use chrono::TimeZone;

    fn fast_settings() -> CryptoSettings {
        CryptoSettings {
            enabled: true,
            kdf: KdfParams {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
            ..Default::default()
        }
    }

    fn encryptor() -> FieldEncryptor {
        FieldEncryptor::new(&fast_settings(), Some("correct horse".to_string())).unwrap()
    }

    #[test]
    fn test_window_labels() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 14, 59, 59).unwrap();
        assert_eq!(window_label(WindowGranularity::Hourly, at), "2024031514");
        assert_eq!(window_label(WindowGranularity::Daily, at), "20240315");
    }

    #[test]
    fn test_missing_passphrase_is_fatal() {
        let err = FieldEncryptor::new(&fast_settings(), None).unwrap_err();
        assert!(matches!(err, SanitizeError::MissingPassphrase));
        let err = FieldEncryptor::new(&fast_settings(), Some(String::new())).unwrap_err();
        assert!(matches!(err, SanitizeError::MissingPassphrase));
    }

    #[test]
    fn test_disabled_returns_placeholder() {
        let enc = FieldEncryptor::new(&CryptoSettings::default(), None).unwrap();
        assert!(!enc.is_enabled());
        assert_eq!(enc.encrypt("nome", "Maria").unwrap(), "nome:REDACTED");
        assert!(enc.decrypt("nome:REDACTED").is_err());
    }

    #[test]
    fn test_seal_format_and_roundtrip() {
        let enc = encryptor();
        let key = enc.key_for_window("2024031514").unwrap();
        let token = key.seal("nome", "Maria da Silva").unwrap();

        assert!(token.starts_with("nome:ENC[v1|2024031514|"));
        assert!(token.ends_with(']'));
        assert!(!token.contains("Maria"));
        assert_eq!(enc.decrypt(&token).unwrap(), "Maria da Silva");
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let key = encryptor().key_for_window("20240315").unwrap();
        let a = key.seal("f", "same").unwrap();
        let b = key.seal("f", "same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_passphrase_fails_authentication() {
        let token = encryptor()
            .key_for_window("2024031514")
            .unwrap()
            .seal("f", "segredo")
            .unwrap();
        let other = FieldEncryptor::new(&fast_settings(), Some("wrong".to_string())).unwrap();
        assert!(matches!(other.decrypt(&token), Err(SanitizeError::Crypto(_))));
    }

    #[test]
    fn test_tampered_window_fails() {
        let enc = encryptor();
        let token = enc.key_for_window("2024031514").unwrap().seal("f", "x").unwrap();
        let tampered = token.replace("2024031514", "2024031515");
        assert!(enc.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_malformed_envelopes() {
        let enc = encryptor();
        for bad in ["", "ENC[", "ENC[v1|a|b]", "ENC[v2|a|b|c]", "ENC[v1|w|!!|c]"] {
            assert!(enc.decrypt(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_template_single_pass() {
        let out = render_template("{field}={ciphertext}{unknown}", "{nonce}", "w", "n", "c");
        assert_eq!(out, "{nonce}=c{unknown}");
    }

    #[test]
    fn test_context_separates_keys() {
        let enc = encryptor();
        let token = enc.key_for_window("20240315").unwrap().seal("f", "x").unwrap();

        let mut settings = fast_settings();
        settings.context = "other".to_string();
        let other = FieldEncryptor::new(&settings, Some("correct horse".to_string())).unwrap();
        assert!(other.decrypt(&token).is_err());
    }

    #[test]
    fn test_debug_hides_passphrase() {
        let rendered = format!("{:?}", encryptor());
        assert!(!rendered.contains("correct horse"));
    }
}
