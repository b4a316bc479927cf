//! Lamport one-time signatures over SHAKE256.
//!
//! With hash output size `n` bytes the message digest has `8n` bits. For
//! every bit the secret key holds two `n`-byte preimages and the public key
//! their hashes; a signature reveals one preimage per bit.
//!
//! ```text
//! sk = [s(0,0) s(0,1) s(1,0) s(1,1) ... ]      16n² bytes
//! pk = [H(s(0,0)) H(s(0,1)) ... ]              16n² bytes
//! sig = [s(i, bit_i) for i in 0..8n]            8n² bytes
//! ```
//!
//! A Lamport key must sign at most one message. Signing two different
//! messages reveals enough preimages to forge.

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use qwallet_core::constants::DOMAIN_LAMPORT;
use qwallet_core::error::{Result, WalletError};

use crate::hash::shake256;

const DOMAIN_LAMPORT_CHAIN: &[u8] = b"qwallet/lamport/pk/v1";

/// Supported hash output sizes, indexed by level 1, 3, 5.
pub const HASH_SIZES: [usize; 3] = [32, 48, 64];

/// Hash output size for a security level.
pub fn hash_size_for_level(level: u8) -> Option<usize> {
    match level {
        1 => Some(HASH_SIZES[0]),
        3 => Some(HASH_SIZES[1]),
        5 => Some(HASH_SIZES[2]),
        _ => None,
    }
}

/// Public (and secret) key size for hash output size `n`.
pub const fn key_size(n: usize) -> usize {
    16 * n * n
}

/// Signature size for hash output size `n`.
pub const fn signature_size(n: usize) -> usize {
    8 * n * n
}

fn n_for_key_len(len: usize) -> Option<usize> {
    HASH_SIZES.into_iter().find(|&n| key_size(n) == len)
}

fn message_bits(n: usize, message: &[u8]) -> impl Iterator<Item = usize> {
    let digest = shake256(DOMAIN_LAMPORT, message, n);
    (0..8 * n).map(move |i| usize::from((digest[i / 8] >> (7 - (i % 8))) & 1))
}

/// Generates a keypair with hash output size `n`.
pub fn keypair(n: usize) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
    if !HASH_SIZES.contains(&n) {
        return Err(WalletError::invalid(format!("unsupported Lamport hash size {n}")));
    }
    let mut sk = Zeroizing::new(vec![0u8; key_size(n)]);
    OsRng
        .try_fill_bytes(&mut sk[..])
        .map_err(|e| WalletError::primitive(format!("entropy source failed: {e}")))?;
    let pk = public_from_secret(&sk)?;
    Ok((pk, sk))
}

/// Recomputes the public key from a secret key.
pub fn public_from_secret(sk: &[u8]) -> Result<Vec<u8>> {
    let n = n_for_key_len(sk.len()).ok_or_else(|| {
        WalletError::invalid(format!("{} bytes is not a Lamport secret key", sk.len()))
    })?;
    let mut pk = Vec::with_capacity(sk.len());
    for block in sk.chunks_exact(n) {
        pk.extend_from_slice(&shake256(DOMAIN_LAMPORT_CHAIN, block, n));
    }
    Ok(pk)
}

/// Signs `message`.
pub fn sign(sk: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let n = n_for_key_len(sk.len()).ok_or_else(|| {
        WalletError::invalid(format!("{} bytes is not a Lamport secret key", sk.len()))
    })?;
    let mut sig = Vec::with_capacity(signature_size(n));
    for (i, bit) in message_bits(n, message).enumerate() {
        let start = (2 * i + bit) * n;
        sig.extend_from_slice(&sk[start..start + n]);
    }
    Ok(sig)
}

/// Verifies a signature. Malformed inputs return `false`.
pub fn verify(pk: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Some(n) = n_for_key_len(pk.len()) else {
        return false;
    };
    if signature.len() != signature_size(n) {
        return false;
    }

    let mut ok = subtle::Choice::from(1u8);
    for ((i, bit), revealed) in message_bits(n, message)
        .enumerate()
        .zip(signature.chunks_exact(n))
    {
        let start = (2 * i + bit) * n;
        let expected = &pk[start..start + n];
        ok &= shake256(DOMAIN_LAMPORT_CHAIN, revealed, n).as_slice().ct_eq(expected);
    }
    ok.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(key_size(32), 16_384);
        assert_eq!(signature_size(32), 8_192);
        assert_eq!(key_size(64), 65_536);
        assert_eq!(hash_size_for_level(3), Some(48));
        assert_eq!(hash_size_for_level(2), None);
    }

    #[test]
    fn test_sign_verify() {
        let (pk, sk) = keypair(32).unwrap();
        assert_eq!(pk.len(), key_size(32));
        let sig = sign(&sk, b"hello").unwrap();
        assert_eq!(sig.len(), signature_size(32));
        assert!(verify(&pk, b"hello", &sig));
        assert!(!verify(&pk, b"hellp", &sig));
    }

    #[test]
    fn test_public_from_secret_matches() {
        let (pk, sk) = keypair(48).unwrap();
        assert_eq!(public_from_secret(&sk).unwrap(), pk);
    }

    #[test]
    fn test_malformed_inputs() {
        let (pk, sk) = keypair(32).unwrap();
        let sig = sign(&sk, b"m").unwrap();
        assert!(!verify(&pk[..100], b"m", &sig));
        assert!(!verify(&pk, b"m", &sig[..sig.len() - 1]));
        assert!(sign(&sk[..10], b"m").is_err());
        assert!(keypair(40).is_err());
    }

    #[test]
    fn test_keys_are_random() {
        let (pk1, _) = keypair(32).unwrap();
        let (pk2, _) = keypair(32).unwrap();
        assert_ne!(pk1, pk2);
    }
}
