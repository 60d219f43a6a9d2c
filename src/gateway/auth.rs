//! Ed25519 request signing.
//!
//! The signed payload is the concatenation `timestamp_ms || METHOD || path`
//! — path only, no query string, no body, even for POST.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroizing;

use crate::error::GatewayError;

/// The three headers a signed request must carry.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub access_key: String,
    pub signature: String,
    pub timestamp_ms: String,
}

impl SignedHeaders {
    pub fn as_tuples(&self) -> [(&'static str, &str); 3] {
        [
            ("KALSHI-ACCESS-KEY", &self.access_key),
            ("KALSHI-ACCESS-SIGNATURE", &self.signature),
            ("KALSHI-ACCESS-TIMESTAMP", &self.timestamp_ms),
        ]
    }
}

/// Holds the signing key and access-key identifier. Key material is
/// read-only after construction and safe to share behind an `Arc`.
pub struct GatewayAuth {
    access_key: String,
    signing_key: SigningKey,
}

impl std::fmt::Debug for GatewayAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayAuth")
            .field("access_key", &self.access_key)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

impl GatewayAuth {
    /// Loads a signing key from a raw 32-byte seed.
    pub fn from_seed_bytes(access_key: impl Into<String>, seed: &[u8]) -> Result<Self, GatewayError> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| GatewayError::Config("Ed25519 seed must be exactly 32 bytes".into()))?;
        Ok(Self {
            access_key: access_key.into(),
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Loads a signing key from a base64-encoded 32-byte seed, trying
    /// standard alphabet first then URL-safe, mirroring the fallback
    /// decode chain used elsewhere in this codebase for key material.
    pub fn from_base64_seed(access_key: impl Into<String>, encoded: &str) -> Result<Self, GatewayError> {
        use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
        let decoded: Zeroizing<Vec<u8>> = Zeroizing::new(
            STANDARD
                .decode(encoded)
                .or_else(|_| URL_SAFE.decode(encoded))
                .or_else(|_| URL_SAFE_NO_PAD.decode(encoded))
                .map_err(|e| GatewayError::Config(format!("invalid base64 private key: {e}")))?,
        );
        Self::from_seed_bytes(access_key, &decoded)
    }

    /// Signs `method`/`path` at the current wall-clock time.
    pub fn sign_request(&self, method: &str, path: &str) -> SignedHeaders {
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        self.sign_request_with_timestamp(method, path, timestamp_ms)
    }

    fn sign_request_with_timestamp(&self, method: &str, path: &str, timestamp_ms: i64) -> SignedHeaders {
        let timestamp_str = timestamp_ms.to_string();
        let message = format!("{timestamp_str}{}{path}", method.to_uppercase());
        let signature = self.signing_key.sign(message.as_bytes());
        SignedHeaders {
            access_key: self.access_key.clone(),
            signature: STANDARD.encode(signature.to_bytes()),
            timestamp_ms: timestamp_str,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_auth() -> GatewayAuth {
        let seed = [7u8; 32];
        GatewayAuth::from_seed_bytes("KEY123", &seed).unwrap()
    }

    #[test]
    fn signing_is_deterministic_given_fixed_timestamp() {
        let auth = test_auth();
        let a = auth.sign_request_with_timestamp("GET", "/markets", 1_700_000_000_000);
        let b = auth.sign_request_with_timestamp("GET", "/markets", 1_700_000_000_000);
        assert_eq!(a.signature, b.signature);
    }

    #[test]
    fn signature_changes_with_path() {
        let auth = test_auth();
        let a = auth.sign_request_with_timestamp("GET", "/markets", 1_700_000_000_000);
        let b = auth.sign_request_with_timestamp("GET", "/markets/TICK", 1_700_000_000_000);
        assert_ne!(a.signature, b.signature);
    }

    #[test]
    fn method_is_uppercased_in_message() {
        let auth = test_auth();
        let a = auth.sign_request_with_timestamp("get", "/markets", 1_700_000_000_000);
        let b = auth.sign_request_with_timestamp("GET", "/markets", 1_700_000_000_000);
        assert_eq!(a.signature, b.signature);
    }

    #[test]
    fn seed_must_be_32_bytes() {
        let err = GatewayAuth::from_seed_bytes("K", &[1, 2, 3]);
        assert!(err.is_err());
    }

    #[test]
    fn debug_redacts_key_material() {
        let auth = test_auth();
        let debug = format!("{auth:?}");
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn header_tuples_carry_expected_names() {
        let auth = test_auth();
        let headers = auth.sign_request("GET", "/markets");
        let tuples = headers.as_tuples();
        assert_eq!(tuples[0].0, "KALSHI-ACCESS-KEY");
        assert_eq!(tuples[1].0, "KALSHI-ACCESS-SIGNATURE");
        assert_eq!(tuples[2].0, "KALSHI-ACCESS-TIMESTAMP");
    }
}
