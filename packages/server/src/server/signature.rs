//! Ed25519 verification of Discord interaction requests.
//!
//! Discord signs `timestamp || body` with the application's key and sends the
//! signature and timestamp in `X-Signature-Ed25519` / `X-Signature-Timestamp`.
//! Requests that fail verification must be rejected with 401.

use anyhow::{Context, Result};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature headers")]
    MissingHeaders,
    #[error("signature is not valid hex of the right length")]
    Malformed,
    #[error("signature does not match")]
    Mismatch,
}

#[derive(Debug, Clone)]
pub struct InteractionVerifier {
    key: VerifyingKey,
}

impl InteractionVerifier {
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Parse the hex public key from the developer portal.
    pub fn from_hex(public_key: &str) -> Result<Self> {
        let bytes: [u8; 32] = hex::decode(public_key.trim())
            .context("DISCORD_PUBLIC_KEY must be hex")?
            .try_into()
            .map_err(|_| anyhow::anyhow!("DISCORD_PUBLIC_KEY must be 32 bytes"))?;
        let key = VerifyingKey::from_bytes(&bytes).context("DISCORD_PUBLIC_KEY is not a valid key")?;
        Ok(Self { key })
    }

    pub fn verify(
        &self,
        signature_hex: &str,
        timestamp: &str,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        let bytes: [u8; 64] = hex::decode(signature_hex)
            .map_err(|_| SignatureError::Malformed)?
            .try_into()
            .map_err(|_| SignatureError::Malformed)?;
        let signature = Signature::from_bytes(&bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify(&message, &signature)
            .map_err(|_| SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn sign(key: &SigningKey, timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(key.sign(&message).to_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let key = signing_key();
        let verifier = InteractionVerifier::from_hex(&hex::encode(key.verifying_key().to_bytes()))
            .unwrap();
        let body = br#"{"type":1}"#;

        let signature = sign(&key, "1700000000", body);

        assert_eq!(verifier.verify(&signature, "1700000000", body), Ok(()));
    }

    #[test]
    fn rejects_tampered_body_and_timestamp() {
        let key = signing_key();
        let verifier = InteractionVerifier::new(key.verifying_key());
        let signature = sign(&key, "1700000000", b"{}");

        assert_eq!(
            verifier.verify(&signature, "1700000000", b"{ }"),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verifier.verify(&signature, "1700000001", b"{}"),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_malformed_signature() {
        let verifier = InteractionVerifier::new(signing_key().verifying_key());

        assert_eq!(
            verifier.verify("zz", "1", b"{}"),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verifier.verify("abcd", "1", b"{}"),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn rejects_bad_public_key() {
        assert!(InteractionVerifier::from_hex("not hex").is_err());
        assert!(InteractionVerifier::from_hex("abcd").is_err());
    }
}
