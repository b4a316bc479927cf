//! Hashing utilities with domain separation.
//!
//! Every hash in qwallet is domain separated:
//!
//! ```text
//! output = H(len(domain) || domain || input)
//! ```
//!
//! so an address digest can never collide with a transaction pre-hash or a
//! Lamport message digest built from the same bytes.

use blake2::digest::consts::U32;
use blake2::Blake2b;
use sha2::{Digest, Sha256};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Sha3_256, Shake256};

use qwallet_core::constants::HASH_OUTPUT_SIZE;
use qwallet_core::types::HashVariant;

type Blake2b256 = Blake2b<U32>;

// ═══════════════════════════════════════════════════════════════════════════════
// SHAKE256 FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes SHAKE256 with domain separation.
///
/// # Example
///
/// ```rust
/// use qwallet_crypto::shake256;
///
/// let a = shake256(b"domain-a", b"input", 32);
/// let b = shake256(b"domain-b", b"input", 32);
/// assert_ne!(a, b);
/// ```
pub fn shake256(domain: &[u8], input: &[u8], output_len: usize) -> Vec<u8> {
    shake256_multi(domain, &[input], output_len)
}

/// Computes SHAKE256 over several length-prefixed inputs.
pub fn shake256_multi(domain: &[u8], inputs: &[&[u8]], output_len: usize) -> Vec<u8> {
    let mut hasher = Shake256::default();

    hasher.update(&(domain.len() as u32).to_le_bytes());
    hasher.update(domain);

    // Length prefixes keep (a, bc) and (ab, c) apart
    for input in inputs {
        hasher.update(&(input.len() as u64).to_le_bytes());
        hasher.update(input);
    }

    let mut reader = hasher.finalize_xof();
    let mut output = vec![0u8; output_len];
    reader.read(&mut output);
    output
}

/// SHAKE256 into a fixed-size array.
pub fn shake256_array<const N: usize>(domain: &[u8], inputs: &[&[u8]]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&shake256_multi(domain, inputs, N));
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// HASH VARIANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Domain-separated SHA-256 over several length-prefixed inputs.
pub fn sha256_multi(domain: &[u8], inputs: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    Digest::update(&mut hasher, (domain.len() as u32).to_le_bytes());
    Digest::update(&mut hasher, domain);
    for input in inputs {
        Digest::update(&mut hasher, (input.len() as u64).to_le_bytes());
        Digest::update(&mut hasher, input);
    }
    hasher.finalize().into()
}

/// Domain-separated 32-byte digest under the selected hash variant.
pub fn digest(variant: HashVariant, domain: &[u8], input: &[u8]) -> [u8; HASH_OUTPUT_SIZE] {
    let mut framed = Vec::with_capacity(4 + domain.len() + input.len());
    framed.extend_from_slice(&(domain.len() as u32).to_le_bytes());
    framed.extend_from_slice(domain);
    framed.extend_from_slice(input);

    match variant {
        HashVariant::Sha256 => <Sha256 as Digest>::digest(&framed).into(),
        HashVariant::Sha3_256 => <Sha3_256 as Digest>::digest(&framed).into(),
        HashVariant::Blake2b256 => <Blake2b256 as Digest>::digest(&framed).into(),
        HashVariant::Shake256 => {
            let mut hasher = Shake256::default();
            hasher.update(&framed);
            let mut out = [0u8; HASH_OUTPUT_SIZE];
            hasher.finalize_xof().read(&mut out);
            out
        }
    }
}
