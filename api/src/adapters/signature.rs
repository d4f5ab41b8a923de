//! Webhook signature verification
//!
//! HMAC-SHA256 over the raw request body, hex encoded. GitHub sends the
//! digest as `sha256=<hex>` in `X-Hub-Signature-256`; the GitLab adapter
//! uses the bare hex digest.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::GitProviderError;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies webhook payloads with one shared secret
#[derive(Clone)]
pub struct WebhookSigner {
    mac: HmacSha256,
}

impl WebhookSigner {
    pub const GITHUB_PREFIX: &'static str = "sha256=";

    pub fn new(secret: &str) -> Result<Self, GitProviderError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| GitProviderError::InvalidCredential("invalid webhook secret".into()))?;
        Ok(Self { mac })
    }

    /// Lowercase hex HMAC-SHA256 of `payload`
    pub fn sign_hex(&self, payload: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Compare a bare hex signature in constant time
    ///
    /// The comparison is over the encoded string, so an uppercase digest
    /// does not match.
    pub fn verify_hex(&self, payload: &[u8], signature: &str) -> bool {
        let expected = self.sign_hex(payload);
        bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
    }

    /// Compare a `sha256=<hex>` signature in constant time
    pub fn verify_prefixed(&self, payload: &[u8], signature: &str) -> bool {
        let Some(hex_part) = signature.strip_prefix(Self::GITHUB_PREFIX) else {
            tracing::debug!("Webhook signature is missing the sha256= prefix");
            return false;
        };
        self.verify_hex(payload, hex_part)
    }
}

impl std::fmt::Debug for WebhookSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSigner").finish_non_exhaustive()
    }
}
