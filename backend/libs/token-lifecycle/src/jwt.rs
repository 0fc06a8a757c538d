//! JWT verification and claim decoding backed by `jsonwebtoken`
//!
//! - [`Rs256Verifier`] is the authoritative check (signature + `exp`), RS256 only
//!   so that a symmetric key can never be confused with the public key.
//! - [`PayloadDecoder`] reads `exp`/`iat` out of the payload segment without
//!   touching the signature; cleanup uses it to decide what can be forgotten.

use crate::external::{Claims, TokenDecoder, TokenVerifier, UnverifiedClaims};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::debug;

const JWT_ALGORITHM: Algorithm = Algorithm::RS256;

pub struct Rs256Verifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Rs256Verifier {
    /// Build a verifier from an RSA public key in PEM format.
    ///
    /// Expiry is enforced with zero leeway: a token whose `exp` has passed is
    /// rejected immediately.
    pub fn from_public_pem(public_key_pem: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())?;
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Tolerate clock skew between issuer and verifier
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.validation.leeway = leeway_secs;
        self
    }
}

#[async_trait]
impl TokenVerifier for Rs256Verifier {
    async fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(token_data) => Some(token_data.claims),
            Err(e) => {
                debug!(error = %e, "JWT verification failed");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadDecoder;

impl TokenDecoder for PayloadDecoder {
    fn decode(&self, token: &str) -> Option<UnverifiedClaims> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return None;
        }

        let payload = URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
        serde_json::from_slice::<UnverifiedClaims>(&payload).ok()
    }
}
