use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::digest::{digest, SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::{Zeroize, Zeroizing};

use crate::types::errors::CryptoError;

/// Entropy behind a PKCE code verifier, in bytes. Encodes to 43 characters.
const VERIFIER_ENTROPY: usize = 32;

/// A PKCE verifier and its S256 challenge.
pub struct PkcePair {
    /// Kept until the authorization code is exchanged; wiped on drop.
    pub verifier: Zeroizing<String>,
    pub challenge: String,
}

/// Trait defining the randomness and hashing the sign-in flow needs.
pub trait CryptoServiceTrait {
    /// Generates cryptographically secure random bytes of the specified length.
    fn generate_random_bytes(&self, length: usize) -> Result<Vec<u8>, CryptoError>;

    /// Generates a fresh PKCE verifier and its S256 challenge.
    fn generate_pkce_pair(&self) -> Result<PkcePair, CryptoError>;
}

/// Implementation of cryptographic services using the `ring` crate.
pub struct CryptoService {
    rng: SystemRandom,
}

impl CryptoService {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for CryptoService {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoServiceTrait for CryptoService {
    fn generate_random_bytes(&self, length: usize) -> Result<Vec<u8>, CryptoError> {
        let mut bytes = vec![0u8; length];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| CryptoError::RandomGeneration("Failed to generate random bytes".to_string()))?;
        Ok(bytes)
    }

    fn generate_pkce_pair(&self) -> Result<PkcePair, CryptoError> {
        let mut entropy = self.generate_random_bytes(VERIFIER_ENTROPY)?;
        let verifier = Zeroizing::new(URL_SAFE_NO_PAD.encode(&entropy));
        entropy.zeroize();
        let challenge = pkce_challenge(&verifier);
        Ok(PkcePair { verifier, challenge })
    }
}

/// S256 code challenge: base64url (unpadded) of the verifier's SHA-256 digest.
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(digest(&SHA256, verifier.as_bytes()).as_ref())
}

/// Uniformly-ish random index below `len`. Falls back to 0 if the system RNG fails.
pub fn random_index(len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let mut buf = [0u8; 8];
    match SystemRandom::new().fill(&mut buf) {
        Ok(()) => (u64::from_le_bytes(buf) % len as u64) as usize,
        Err(_) => 0,
    }
}
