use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::domain::subscription::WebhookSecret;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm token carried in front of the hex digest.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Error type for signing operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("Webhook secret is empty")]
    EmptySecret,

    #[error("Failed to install HMAC key: {0}")]
    InvalidKey(String),

    #[error("Invalid signature")]
    Mismatch,

    #[error("Signature is not valid hex: {0}")]
    MalformedSignature(String),
}

/// HMAC-SHA256 signer for webhook authentication
pub struct HmacSigner {
    secret: Vec<u8>,
}

impl HmacSigner {
    /// New HMAC signer with the given secret
    pub fn new(secret: &WebhookSecret) -> Result<Self, SigningError> {
        if secret.is_empty() {
            return Err(SigningError::EmptySecret);
        }

        Ok(Self {
            secret: secret.expose().to_vec(),
        })
    }

    /// Lowercase hex HMAC-SHA256 of `payload`
    pub fn sign(&self, payload: &[u8]) -> Result<String, SigningError> {
        let mut mac = self.mac()?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify a hex signature in constant time
    pub fn verify(&self, payload: &[u8], signature_hex: &str) -> Result<(), SigningError> {
        let expected = hex::decode(signature_hex)
            .map_err(|e| SigningError::MalformedSignature(e.to_string()))?;

        let mut mac = self.mac()?;
        mac.update(payload);
        mac.verify_slice(&expected)
            .map_err(|_| SigningError::Mismatch)
    }

    fn mac(&self) -> Result<HmacSha256, SigningError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| SigningError::InvalidKey(e.to_string()))
    }
}

/// Sign `payload` with `secret` in one call
pub fn sign(secret: &WebhookSecret, payload: &[u8]) -> Result<String, SigningError> {
    HmacSigner::new(secret)?.sign(payload)
}

/// Helper function to format signature for HTTP header
pub fn format_signature_header(signature: &str) -> String {
    format!("{SIGNATURE_PREFIX}{signature}")
}

/// Helper function to parse signature from HTTP header
pub fn parse_signature_header(header: &str) -> Result<&str, SigningError> {
    header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| SigningError::MalformedSignature(format!("missing {SIGNATURE_PREFIX} prefix")))
}
