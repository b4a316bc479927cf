//! Keyring: key generation, signing and verification.
//!
//! Wraps `pqcrypto-dilithium`, `pqcrypto-sphincsplus` and the in-crate
//! Lamport scheme behind one interface keyed by [`Scheme`]. Signing and
//! verification take raw key bytes; the level is recovered from the key
//! length through the registry, whose size table comes from the same
//! primitives.
//!
//! ## Backup policy
//!
//! A backup keypair always comes from a different signature family than
//! the primary where possible, so a break in one family does not also
//! break recovery:
//!
//! | Primary   | Backup    |
//! |-----------|-----------|
//! | Dilithium | SPHINCS+  |
//! | SPHINCS+  | Dilithium |
//! | Lamport   | Dilithium |

use pqcrypto_dilithium::{dilithium2, dilithium3, dilithium5};
use pqcrypto_sphincsplus::{sphincsshake128fsimple, sphincsshake192fsimple, sphincsshake256fsimple};
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};
use tracing::{debug, error, instrument};
use zeroize::Zeroizing;

use qwallet_core::constants::{DEFAULT_SECURITY_LEVEL, KEYPAIR_PROBE_MESSAGE};
use qwallet_core::error::{Result, WalletError};
use qwallet_core::types::{BackupKeypair, HashVariant, Keypair, PublicKey, Scheme, SecretKey};

use crate::{lamport, registry};

// ═══════════════════════════════════════════════════════════════════════════════
// PRIMITIVE DISPATCH
// ═══════════════════════════════════════════════════════════════════════════════

macro_rules! pq_keypair {
    ($m:ident) => {{
        let (pk, sk) = $m::keypair();
        (pk.as_bytes().to_vec(), Zeroizing::new(sk.as_bytes().to_vec()))
    }};
}

macro_rules! pq_sign {
    ($m:ident, $sk:expr, $msg:expr) => {{
        let sk = $m::SecretKey::from_bytes($sk)
            .map_err(|e| WalletError::primitive(format!("secret key rejected: {e:?}")))?;
        $m::detached_sign($msg, &sk).as_bytes().to_vec()
    }};
}

macro_rules! pq_verify {
    ($m:ident, $pk:expr, $msg:expr, $sig:expr) => {{
        match ($m::PublicKey::from_bytes($pk), $m::DetachedSignature::from_bytes($sig)) {
            (Ok(pk), Ok(sig)) => $m::verify_detached_signature(&sig, $msg, &pk).is_ok(),
            _ => false,
        }
    }};
}

fn primitive_keypair(scheme: Scheme, level: u8) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
    Ok(match (scheme, level) {
        (Scheme::Dilithium, 2) => pq_keypair!(dilithium2),
        (Scheme::Dilithium, 3) => pq_keypair!(dilithium3),
        (Scheme::Dilithium, 5) => pq_keypair!(dilithium5),
        (Scheme::Sphincs, 1) => pq_keypair!(sphincsshake128fsimple),
        (Scheme::Sphincs, 3) => pq_keypair!(sphincsshake192fsimple),
        (Scheme::Sphincs, 5) => pq_keypair!(sphincsshake256fsimple),
        (Scheme::Lamport, level) => {
            let n = lamport::hash_size_for_level(level)
                .ok_or_else(|| WalletError::invalid(format!("lamport level {level}")))?;
            lamport::keypair(n)?
        }
        (scheme, level) => {
            return Err(WalletError::invalid(format!("{scheme} level {level}")));
        }
    })
}

fn primitive_sign(scheme: Scheme, level: u8, sk: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    Ok(match (scheme, level) {
        (Scheme::Dilithium, 2) => pq_sign!(dilithium2, sk, message),
        (Scheme::Dilithium, 3) => pq_sign!(dilithium3, sk, message),
        (Scheme::Dilithium, 5) => pq_sign!(dilithium5, sk, message),
        (Scheme::Sphincs, 1) => pq_sign!(sphincsshake128fsimple, sk, message),
        (Scheme::Sphincs, 3) => pq_sign!(sphincsshake192fsimple, sk, message),
        (Scheme::Sphincs, 5) => pq_sign!(sphincsshake256fsimple, sk, message),
        (Scheme::Lamport, _) => lamport::sign(sk, message)?,
        (scheme, level) => {
            return Err(WalletError::invalid(format!("{scheme} level {level}")));
        }
    })
}

fn primitive_verify(scheme: Scheme, level: u8, pk: &[u8], message: &[u8], sig: &[u8]) -> bool {
    match (scheme, level) {
        (Scheme::Dilithium, 2) => pq_verify!(dilithium2, pk, message, sig),
        (Scheme::Dilithium, 3) => pq_verify!(dilithium3, pk, message, sig),
        (Scheme::Dilithium, 5) => pq_verify!(dilithium5, pk, message, sig),
        (Scheme::Sphincs, 1) => pq_verify!(sphincsshake128fsimple, pk, message, sig),
        (Scheme::Sphincs, 3) => pq_verify!(sphincsshake192fsimple, pk, message, sig),
        (Scheme::Sphincs, 5) => pq_verify!(sphincsshake256fsimple, pk, message, sig),
        (Scheme::Lamport, _) => lamport::verify(pk, message, sig),
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEYRING OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Generates a fresh keypair from the operating system's CSPRNG.
///
/// # Errors
/// - `InvalidParameters` if `security_level` is not supported by `scheme`
/// - `PrimitiveFailure` if the primitive returns keys of unexpected size
#[instrument(skip_all, fields(scheme = %scheme, level = security_level))]
pub fn generate(scheme: Scheme, security_level: u8, hash_variant: HashVariant) -> Result<Keypair> {
    let params = registry::validate(scheme, security_level)?;

    let (pk, sk) = primitive_keypair(scheme, security_level)?;

    if pk.len() != params.public_key_size || sk.len() != params.secret_key_size {
        error!(
            scheme = %scheme,
            level = security_level,
            pk_len = pk.len(),
            sk_len = sk.len(),
            "Primitive returned keys of unexpected size"
        );
        return Err(WalletError::primitive(format!(
            "{} returned {}/{} byte keys, expected {}/{}",
            params.parameter_set,
            pk.len(),
            sk.len(),
            params.public_key_size,
            params.secret_key_size
        )));
    }

    debug!(pk_len = pk.len(), "Generated keypair");

    Ok(Keypair {
        scheme,
        security_level,
        hash_variant,
        public_key: PublicKey::from_bytes(pk),
        secret_key: SecretKey::from_bytes(sk.to_vec()),
    })
}

/// Scheme used for the backup of a primary keypair.
pub fn backup_scheme_for(primary: Scheme) -> Scheme {
    match primary {
        Scheme::Dilithium => Scheme::Sphincs,
        Scheme::Sphincs | Scheme::Lamport => Scheme::Dilithium,
    }
}

/// Generates a recovery keypair under a different scheme than `primary_scheme`.
pub fn generate_backup(primary_scheme: Scheme) -> Result<BackupKeypair> {
    generate(
        backup_scheme_for(primary_scheme),
        DEFAULT_SECURITY_LEVEL,
        HashVariant::default(),
    )
}

/// Signs `message` with raw secret key bytes.
///
/// # Errors
/// - `InvalidParameters` if the key length matches no level of `scheme`
/// - `PrimitiveFailure` if the primitive rejects the key
pub fn sign(secret_key: &SecretKey, scheme: Scheme, message: &[u8]) -> Result<Vec<u8>> {
    let level = registry::level_for_secret_key(scheme, secret_key.len()).ok_or_else(|| {
        WalletError::invalid(format!(
            "{} byte key is not a {scheme} secret key",
            secret_key.len()
        ))
    })?;

    primitive_sign(scheme, level, secret_key.as_bytes(), message).map_err(|e| {
        error!(scheme = %scheme, level, error = %e, "Signing failed");
        e
    })
}

/// Verifies a signature. Never fails: malformed keys or signatures give `false`.
pub fn verify(public_key: &PublicKey, scheme: Scheme, message: &[u8], signature: &[u8]) -> bool {
    let Some(level) = registry::level_for_public_key(scheme, public_key.len()) else {
        return false;
    };
    primitive_verify(scheme, level, public_key.as_bytes(), message, signature)
}

/// Checks that a keypair's halves belong together.
///
/// Lamport keys are checked by recomputing the public key, so the one-time
/// key is not spent on a probe signature.
pub fn verify_keypair(keypair: &Keypair) -> bool {
    if registry::validate(keypair.scheme, keypair.security_level).is_err() {
        return false;
    }
    match keypair.scheme {
        Scheme::Lamport => lamport::public_from_secret(keypair.secret_key.as_bytes())
            .map(|pk| pk == keypair.public_key.as_bytes())
            .unwrap_or(false),
        scheme => match sign(&keypair.secret_key, scheme, KEYPAIR_PROBE_MESSAGE) {
            Ok(sig) => verify(&keypair.public_key, scheme, KEYPAIR_PROBE_MESSAGE, &sig),
            Err(_) => false,
        },
    }
}
