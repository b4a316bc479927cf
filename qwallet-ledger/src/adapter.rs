//! Fitting post-quantum signatures into the ledger's 64-byte slot.
//!
//! | Policy      | Slot contents                               | Off-chain data          |
//! |-------------|---------------------------------------------|-------------------------|
//! | OutOfBand   | `SHAKE256("qwallet/commitment/v1", sig)[..64]` | full signature attestation |
//! | Truncating  | first 64 bytes of the signature             | none                    |
//!
//! Neither policy lets the ledger itself check the post-quantum signature.
//! Truncation keeps nothing verifiable: 64 bytes of a Dilithium or SPHINCS+
//! signature prove nothing about the key. OutOfBand commits to the full
//! signature, so a cooperating verifier holding the attestation can check
//! both the commitment and the signature with [`verify_attestation`].

use qwallet_core::constants::{DOMAIN_SIGNATURE_COMMITMENT, LEDGER_SIGNATURE_SIZE};
use qwallet_core::error::{Result, WalletError};
use qwallet_core::traits::{AdaptedSignature, SignatureAdapter};
use qwallet_core::types::{AdapterPolicy, QuantumAttestation};
use qwallet_crypto::hash::shake256_array;

/// Keeps the first 64 signature bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct TruncatingAdapter;

impl SignatureAdapter for TruncatingAdapter {
    fn policy(&self) -> AdapterPolicy {
        AdapterPolicy::Truncating
    }

    fn adapt(&self, signature: &[u8]) -> Result<AdaptedSignature> {
        let head = signature.get(..LEDGER_SIGNATURE_SIZE).ok_or_else(|| {
            WalletError::invalid(format!(
                "signature of {} bytes is shorter than the {LEDGER_SIGNATURE_SIZE}-byte slot",
                signature.len()
            ))
        })?;
        let mut slot = [0u8; LEDGER_SIGNATURE_SIZE];
        slot.copy_from_slice(head);
        Ok(AdaptedSignature {
            slot,
            out_of_band: None,
        })
    }
}

/// Commits to the signature in the slot and carries it out of band.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutOfBandAdapter;

impl SignatureAdapter for OutOfBandAdapter {
    fn policy(&self) -> AdapterPolicy {
        AdapterPolicy::OutOfBand
    }

    fn adapt(&self, signature: &[u8]) -> Result<AdaptedSignature> {
        if signature.is_empty() {
            return Err(WalletError::invalid("cannot commit to an empty signature"));
        }
        Ok(AdaptedSignature {
            slot: commitment(signature),
            out_of_band: Some(signature.to_vec()),
        })
    }
}

/// Slot commitment for a full signature.
pub fn commitment(signature: &[u8]) -> [u8; LEDGER_SIGNATURE_SIZE] {
    shake256_array::<LEDGER_SIGNATURE_SIZE>(DOMAIN_SIGNATURE_COMMITMENT, &[signature])
}

/// Adapter for a wallet's stored policy.
pub fn adapter_for(policy: AdapterPolicy) -> Box<dyn SignatureAdapter> {
    match policy {
        AdapterPolicy::OutOfBand => Box::new(OutOfBandAdapter),
        AdapterPolicy::Truncating => Box::new(TruncatingAdapter),
    }
}

/// Checks an attestation against the slot it claims to back.
///
/// True only if the slot is the commitment to the attested signature and
/// that signature verifies over the attested digest.
pub fn verify_attestation(
    attestation: &QuantumAttestation,
    slot: &[u8; LEDGER_SIGNATURE_SIZE],
) -> bool {
    commitment(&attestation.signature) == *slot
        && qwallet_crypto::verify(
            &attestation.public_key,
            attestation.scheme,
            &attestation.message_digest,
            &attestation.signature,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwallet_core::types::{HashVariant, Scheme};

    #[test]
    fn test_truncating_keeps_prefix() {
        let sig: Vec<u8> = (0..200u8).collect();
        let adapted = TruncatingAdapter.adapt(&sig).unwrap();
        assert_eq!(&adapted.slot[..], &sig[..64]);
        assert!(adapted.out_of_band.is_none());
        assert!(TruncatingAdapter.adapt(&[1u8; 10]).is_err());
    }

    #[test]
    fn test_out_of_band_commits() {
        let sig = vec![5u8; 3000];
        let adapted = OutOfBandAdapter.adapt(&sig).unwrap();
        assert_eq!(adapted.slot, commitment(&sig));
        assert_eq!(adapted.out_of_band.as_deref(), Some(&sig[..]));

        let mut other = sig.clone();
        other[2999] ^= 1;
        assert_ne!(commitment(&other), adapted.slot);
    }

    #[test]
    fn test_adapter_for_policy() {
        for policy in [AdapterPolicy::OutOfBand, AdapterPolicy::Truncating] {
            assert_eq!(adapter_for(policy).policy(), policy);
        }
    }

    #[test]
    fn test_verify_attestation() {
        let kp = qwallet_crypto::generate(Scheme::Dilithium, 2, HashVariant::Sha3_256).unwrap();
        let digest = [9u8; 32];
        let signature = qwallet_crypto::sign(&kp.secret_key, kp.scheme, &digest).unwrap();
        let slot = OutOfBandAdapter.adapt(&signature).unwrap().slot;

        let attestation = QuantumAttestation {
            scheme: kp.scheme,
            security_level: kp.security_level,
            hash_variant: kp.hash_variant,
            public_key: kp.public_key.clone(),
            signature,
            message_digest: digest.to_vec(),
        };
        assert!(verify_attestation(&attestation, &slot));
        assert!(!verify_attestation(&attestation, &[0u8; 64]));

        let mut forged = attestation;
        forged.message_digest[0] ^= 1;
        assert!(!verify_attestation(&forged, &slot));
    }
}
