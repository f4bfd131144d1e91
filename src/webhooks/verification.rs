use crate::error::Result;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verify a base64 HMAC-SHA256 signature over the exact request body.
///
/// Returns `true` only when `signature` decodes to the MAC of `raw_body` under
/// `secret`. Malformed input (bad base64, wrong length, empty, surrounding
/// whitespace) yields `false` rather than an error.
///
/// # Example
///
/// ```rust
/// use money_buddy::webhooks::{sign_base64, verify};
///
/// let body = br#"{"type":"payment.created"}"#;
/// let signature = sign_base64(body, "shared-secret");
/// assert!(verify(body, &signature, "shared-secret"));
/// assert!(!verify(body, &signature, "other-secret"));
/// ```
pub fn verify(raw_body: &[u8], signature: &str, secret: &str) -> bool {
    match BASE64.decode(signature) {
        Ok(provided) => constant_time_compare(&compute_mac(secret.as_bytes(), raw_body), &provided),
        Err(_) => false,
    }
}

/// Compute the base64 HMAC-SHA256 signature a sender would attach to `raw_body`.
pub fn sign_base64(raw_body: &[u8], secret: &str) -> String {
    BASE64.encode(compute_mac(secret.as_bytes(), raw_body))
}

fn compute_mac(key: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Constant-time comparison to prevent timing attacks
///
/// Only the length check is data-dependent, and the MAC length is public.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

/// Trait for verifying webhook signatures
///
/// The receiver only talks to this trait, so providers with a different
/// signing scheme can plug in their own verifier.
#[async_trait]
pub trait WebhookVerifier: Send + Sync {
    /// Verify the webhook signature
    ///
    /// `Ok(true)` if valid, `Ok(false)` if invalid, `Err` only when the
    /// verifier itself could not run.
    async fn verify_signature(&self, payload: &[u8], signature: &str) -> Result<bool>;
}

/// How the sender encodes the MAC in the signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureEncoding {
    /// Square style: `x-square-hmacsha256-signature: oWvD1A==...`
    #[default]
    Base64,
    /// Lowercase or uppercase hex, e.g. `a1b2c3...`
    Hex,
}

/// HMAC-SHA256 webhook verifier with timing-safe comparison
///
/// The secret is held as a [`SecretString`] so it never shows up in debug
/// output or logs.
///
/// # Example
///
/// ```rust
/// use money_buddy::webhooks::HmacSha256Verifier;
///
/// // Square signs with base64 (default)
/// let verifier = HmacSha256Verifier::new("signature-key");
///
/// // Providers that send `sha256=<hex>`
/// let verifier = HmacSha256Verifier::hex("signature-key").with_prefix("sha256=");
/// ```
pub struct HmacSha256Verifier {
    secret: SecretString,
    encoding: SignatureEncoding,
    /// Optional prefix to strip from signatures (e.g., "sha256=")
    signature_prefix: Option<String>,
}

impl HmacSha256Verifier {
    /// Verifier for base64-encoded signatures
    pub fn new(secret: impl Into<SecretString>) -> Self {
        Self {
            secret: secret.into(),
            encoding: SignatureEncoding::Base64,
            signature_prefix: None,
        }
    }

    /// Verifier for hex-encoded signatures
    pub fn hex(secret: impl Into<SecretString>) -> Self {
        Self {
            encoding: SignatureEncoding::Hex,
            ..Self::new(secret)
        }
    }

    /// Strip a prefix from incoming signatures before decoding
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.signature_prefix = Some(prefix.into());
        self
    }

    pub fn encoding(&self) -> SignatureEncoding {
        self.encoding
    }

    fn decode_signature(&self, signature: &str) -> Option<Vec<u8>> {
        let sig = match self.signature_prefix {
            Some(ref prefix) => signature.strip_prefix(prefix.as_str()).unwrap_or(signature),
            None => signature,
        };

        match self.encoding {
            SignatureEncoding::Base64 => BASE64.decode(sig).ok(),
            SignatureEncoding::Hex => hex::decode(sig).ok(),
        }
    }
}

impl std::fmt::Debug for HmacSha256Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSha256Verifier")
            .field("secret", &"[REDACTED]")
            .field("encoding", &self.encoding)
            .field("signature_prefix", &self.signature_prefix)
            .finish()
    }
}

#[async_trait]
impl WebhookVerifier for HmacSha256Verifier {
    async fn verify_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let provided = match self.decode_signature(signature) {
            Some(bytes) => bytes,
            None => {
                tracing::debug!("Failed to decode webhook signature");
                return Ok(false);
            }
        };

        let expected = compute_mac(self.secret.expose_secret().as_bytes(), payload);
        let is_valid = constant_time_compare(&expected, &provided);

        if !is_valid {
            tracing::debug!("Webhook signature verification failed");
        }

        Ok(is_valid)
    }
}
