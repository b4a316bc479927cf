//! Address codec.
//!
//! ## Quantum-native derivation
//!
//! ```text
//! digest  = SHAKE256("qwallet/address/v1", scheme_tag, public_key)[..32]
//! address = bech32m("qw", scheme_tag || digest)
//! ```
//!
//! The scheme tag is hashed in, so the same public-key bytes under two
//! schemes give unrelated addresses.
//!
//! ## Ledger-native projection
//!
//! ```text
//! account = SHA-256("qwallet/ledger/v1", scheme_tag, digest)
//! address = base58(account)
//! ```
//!
//! The projection goes through the quantum digest, so anyone holding only a
//! quantum-native address computes the same ledger account as the key owner.
//!
//! This is a compatibility projection, not proof of control. The ledger
//! authorises spends with its own signature scheme; whether this wallet can
//! spend from the projected account depends entirely on how the signer
//! adapts its post-quantum signature (see `qwallet-ledger`'s adapters).

use serde::Serialize;

use qwallet_core::constants::{DOMAIN_LEDGER_ADDRESS, DOMAIN_QUANTUM_ADDRESS};
use qwallet_core::types::{
    Address, AddressForm, Keypair, LedgerAddress, PublicKey, QuantumAddress, Scheme,
};

use crate::hash::{sha256_multi, shake256_array};

/// Outcome of [`validate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AddressValidation {
    /// Whether the string is a well-formed address
    pub valid: bool,
    /// Which form it takes
    pub form: AddressForm,
}

/// Derives the quantum-native address of a public key.
pub fn derive_quantum_address(public_key: &PublicKey, scheme: Scheme) -> QuantumAddress {
    let digest = shake256_array::<32>(
        DOMAIN_QUANTUM_ADDRESS,
        &[&[scheme.tag()][..], public_key.as_bytes()],
    );
    QuantumAddress::new(scheme, digest)
}

/// Projects a quantum-native address onto the ledger's account format.
pub fn project_to_ledger(address: &QuantumAddress) -> LedgerAddress {
    LedgerAddress::from_array(sha256_multi(
        DOMAIN_LEDGER_ADDRESS,
        &[&[address.scheme().tag()][..], &address.digest()[..]],
    ))
}

/// Derives the ledger-native address of a public key.
pub fn derive_ledger_address(public_key: &PublicKey, scheme: Scheme) -> LedgerAddress {
    project_to_ledger(&derive_quantum_address(public_key, scheme))
}

/// Both addresses of a keypair.
pub fn addresses_of(keypair: &Keypair) -> (QuantumAddress, LedgerAddress) {
    let quantum = derive_quantum_address(&keypair.public_key, keypair.scheme);
    (quantum, project_to_ledger(&quantum))
}

/// Ledger account an address refers to, whatever its form.
pub fn ledger_account(address: &Address) -> LedgerAddress {
    match address {
        Address::Quantum(q) => project_to_ledger(q),
        Address::Ledger(l) => *l,
    }
}

/// Classifies an address string.
///
/// A string is quantum-native, ledger-native, or invalid; never both.
/// Wrong lengths, foreign prefixes, bad checksums and characters outside
/// either alphabet are all invalid.
pub fn validate(address: &str) -> AddressValidation {
    let form = Address::form_of(address);
    AddressValidation {
        valid: form != AddressForm::Invalid,
        form,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring;
    use proptest::prelude::*;
    use qwallet_core::types::HashVariant;

    #[test]
    fn test_quantum_address_is_deterministic() {
        let pk = PublicKey::from_bytes(vec![42u8; 1952]);
        let a = derive_quantum_address(&pk, Scheme::Dilithium);
        let b = derive_quantum_address(&pk, Scheme::Dilithium);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_scheme_tag_separates_addresses() {
        let pk = PublicKey::from_bytes(vec![42u8; 64]);
        let a = derive_quantum_address(&pk, Scheme::Dilithium);
        let b = derive_quantum_address(&pk, Scheme::Sphincs);
        let c = derive_quantum_address(&pk, Scheme::Lamport);
        assert_ne!(a.digest(), b.digest());
        assert_ne!(a.to_string(), b.to_string());
        assert_ne!(b.to_string(), c.to_string());
        assert_ne!(
            derive_ledger_address(&pk, Scheme::Dilithium),
            derive_ledger_address(&pk, Scheme::Sphincs)
        );
    }

    #[test]
    fn test_derived_addresses_validate_as_their_form() {
        let kp = keyring::generate(Scheme::Dilithium, 3, HashVariant::Sha3_256).unwrap();
        let (q, l) = addresses_of(&kp);

        assert_eq!(
            validate(&q.to_string()),
            AddressValidation { valid: true, form: AddressForm::Quantum }
        );
        assert_eq!(
            validate(&l.to_string()),
            AddressValidation { valid: true, form: AddressForm::Ledger }
        );
    }

    #[test]
    fn test_quantum_recipient_maps_to_owner_account() {
        let kp = keyring::generate(Scheme::Sphincs, 1, HashVariant::Sha256).unwrap();
        let (q, l) = addresses_of(&kp);
        let parsed: Address = q.to_string().parse().unwrap();
        assert_eq!(ledger_account(&parsed), l);
        assert_eq!(derive_ledger_address(&kp.public_key, kp.scheme), l);
    }

    #[test]
    fn test_malformed_strings_are_invalid() {
        let q = derive_quantum_address(&PublicKey::from_bytes(vec![1u8; 32]), Scheme::Sphincs)
            .to_string();

        let cases = vec![
            String::new(),
            "qw1".to_string(),
            q[..q.len() - 1].to_string(),
            format!("{q}q"),
            q.replacen("qw1", "qx1", 1),
            "0x1234".to_string(),
            "1111111111111111111111111111111".to_string(), // 31 bytes of zero
        ];
        for case in cases {
            assert_eq!(validate(&case).form, AddressForm::Invalid, "{case:?}");
            assert!(!validate(&case).valid);
        }
    }

    proptest! {
        #[test]
        fn prop_wrong_length_base58_is_invalid(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assume!(bytes.len() != 32);
            let s = bs58::encode(&bytes).into_string();
            prop_assert_eq!(validate(&s).form, AddressForm::Invalid);
        }

        #[test]
        fn prop_single_char_edit_breaks_quantum_checksum(idx in 3usize..62, replacement in "[qpzry9x8gf2tvdw0s3jn54khce6mua7l]") {
            let q = derive_quantum_address(&PublicKey::from_bytes(vec![7u8; 48]), Scheme::Sphincs).to_string();
            let original = q.as_bytes()[idx] as char;
            let new_char = replacement.chars().next().unwrap();
            prop_assume!(original != new_char);
            let mut edited = q.clone();
            edited.replace_range(idx..idx + 1, &new_char.to_string());
            prop_assert_ne!(validate(&edited).form, AddressForm::Quantum);
        }
    }
}
