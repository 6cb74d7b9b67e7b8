// ============================
// formguard-backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Stored hashes are PHC strings. New hashes are produced with Argon2id;
//! verification delegates on the algorithm identifier so accounts hashed
//! with scrypt keep working.
use argon2::{Algorithm, Argon2, Version};
use rand::RngCore;
use scrypt::Scrypt;
use zeroize::Zeroize;

/// Argon2id PHC string with default parameters that no password matches.
/// Unknown accounts are verified against it so a miss costs one full hash.
pub const DUMMY_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHRzYWx0c2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Checks a plaintext password against a stored verifier
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, plain: &str, password_hash: &str) -> bool;
}

/// A verifier that can also produce new hashes
pub trait PasswordEncoder: PasswordVerifier {
    fn encode(&self, plain: &str) -> anyhow::Result<String>;
}

fn random_salt() -> anyhow::Result<argon2::password_hash::SaltString> {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    argon2::password_hash::SaltString::encode_b64(&bytes)
        .map_err(|e| anyhow::anyhow!("failed to encode salt: {e}"))
}

/// Argon2id hashing
#[derive(Debug, Clone)]
pub struct Argon2Encoder {
    params: argon2::Params,
}

impl Default for Argon2Encoder {
    fn default() -> Self {
        Self {
            params: argon2::Params::DEFAULT,
        }
    }
}

impl Argon2Encoder {
    /// Custom cost parameters (memory KiB, iterations, lanes)
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> anyhow::Result<Self> {
        let params = argon2::Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordVerifier for Argon2Encoder {
    fn verify(&self, plain: &str, password_hash: &str) -> bool {
        use argon2::password_hash::{PasswordHash, PasswordVerifier as _};
        let parsed_hash = match PasswordHash::new(password_hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        // Cost parameters come from the hash itself
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

impl PasswordEncoder for Argon2Encoder {
    fn encode(&self, plain: &str) -> anyhow::Result<String> {
        use argon2::password_hash::PasswordHasher as _;
        let salt = random_salt()?;
        let hash = self
            .hasher()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?
            .to_string();
        Ok(hash)
    }
}

/// scrypt hashing
#[derive(Debug, Clone)]
pub struct ScryptEncoder {
    params: scrypt::Params,
}

impl Default for ScryptEncoder {
    fn default() -> Self {
        Self {
            params: scrypt::Params::recommended(),
        }
    }
}

impl ScryptEncoder {
    /// Custom cost parameters
    pub fn with_params(log_n: u8, r: u32, p: u32) -> anyhow::Result<Self> {
        let params = scrypt::Params::new(log_n, r, p, scrypt::Params::RECOMMENDED_LEN)
            .map_err(|e| anyhow::anyhow!("invalid scrypt params: {e}"))?;
        Ok(Self { params })
    }
}

impl PasswordVerifier for ScryptEncoder {
    fn verify(&self, plain: &str, password_hash: &str) -> bool {
        use scrypt::password_hash::{PasswordHash, PasswordVerifier as _};
        let parsed_hash = match PasswordHash::new(password_hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
    }
}

impl PasswordEncoder for ScryptEncoder {
    fn encode(&self, plain: &str) -> anyhow::Result<String> {
        use scrypt::password_hash::{PasswordHasher as _, SaltString};
        let salt = random_salt()?;
        let salt = SaltString::from_b64(salt.as_str())
            .map_err(|e| anyhow::anyhow!("failed to encode salt: {e}"))?;
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?
            .to_string();
        Ok(hash)
    }
}

/// Encodes with Argon2id, verifies by the hash's algorithm identifier
#[derive(Debug, Clone, Default)]
pub struct DelegatingPasswordEncoder {
    argon2: Argon2Encoder,
    scrypt: ScryptEncoder,
}

impl DelegatingPasswordEncoder {
    pub fn new(argon2: Argon2Encoder, scrypt: ScryptEncoder) -> Self {
        Self { argon2, scrypt }
    }
}

impl PasswordVerifier for DelegatingPasswordEncoder {
    fn verify(&self, plain: &str, password_hash: &str) -> bool {
        // PHC: $<id>$...
        let id = password_hash
            .strip_prefix('$')
            .and_then(|rest| rest.split('$').next())
            .unwrap_or_default();
        match id {
            "argon2id" | "argon2i" | "argon2d" => self.argon2.verify(plain, password_hash),
            "scrypt" => self.scrypt.verify(plain, password_hash),
            other => {
                tracing::warn!(algorithm = other, "unsupported password hash algorithm");
                false
            },
        }
    }
}

impl PasswordEncoder for DelegatingPasswordEncoder {
    fn encode(&self, plain: &str) -> anyhow::Result<String> {
        self.argon2.encode(plain)
    }
}

/// Hash a password and zeroize the original
pub fn hash_password_secure<E: PasswordEncoder + ?Sized>(
    encoder: &E,
    plain: &mut String,
) -> anyhow::Result<String> {
    let hash = encoder.encode(plain);
    plain.zeroize();
    hash
}
