//! Algorithm registry.
//!
//! The registry is the single validation gate for scheme/level combinations.
//! Keyring, address codec and benchmark harness all route user-supplied
//! parameters through [`validate`] before doing any work.
//!
//! | Scheme    | Levels  | Parameter sets                              |
//! |-----------|---------|---------------------------------------------|
//! | SPHINCS+  | 1, 3, 5 | SHAKE-128f / 192f / 256f (simple)           |
//! | Dilithium | 2, 3, 5 | Dilithium2 / 3 / 5                           |
//! | Lamport   | 1, 3, 5 | SHAKE256 with 32 / 48 / 64-byte output       |
//!
//! Sizes are taken from the primitive library where it exposes them, so
//! they always match the bytes the keyring actually produces.

use pqcrypto_dilithium::{dilithium2, dilithium3, dilithium5};
use pqcrypto_sphincsplus::{sphincsshake128fsimple, sphincsshake192fsimple, sphincsshake256fsimple};
use serde::Serialize;

use qwallet_core::constants::DEFAULT_SECURITY_LEVEL;
use qwallet_core::error::{Result, WalletError};
use qwallet_core::types::{HashVariant, Scheme};

use crate::lamport;

/// Parameters of one (scheme, level) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LevelParams {
    /// Security level
    pub level: u8,
    /// Concrete parameter set name
    pub parameter_set: &'static str,
    /// Public key size in bytes
    pub public_key_size: usize,
    /// Secret key size in bytes
    pub secret_key_size: usize,
    /// Signature size in bytes
    pub signature_size: usize,
}

/// Description of a registered scheme.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SchemeInfo {
    /// Scheme
    pub scheme: Scheme,
    /// Signature family
    pub family: &'static str,
    /// Whether each key may sign only once
    pub one_time: bool,
    /// Level used when none is given
    pub default_level: u8,
    /// Per-level parameters, ascending
    pub levels: Vec<LevelParams>,
}

impl SchemeInfo {
    /// Supported security levels, ascending.
    pub fn supported_levels(&self) -> Vec<u8> {
        self.levels.iter().map(|l| l.level).collect()
    }

    /// Parameters for one level.
    pub fn params(&self, level: u8) -> Option<&LevelParams> {
        self.levels.iter().find(|l| l.level == level)
    }

    /// Public key size at the default level.
    pub fn key_size(&self) -> usize {
        self.params(self.default_level)
            .map(|p| p.public_key_size)
            .unwrap_or_default()
    }

    /// Signature size at the default level.
    pub fn signature_size(&self) -> usize {
        self.params(self.default_level)
            .map(|p| p.signature_size)
            .unwrap_or_default()
    }
}

/// Registered schemes in display order.
pub fn list_schemes() -> Vec<Scheme> {
    Scheme::ALL.to_vec()
}

/// Registered hash variants.
pub fn list_hash_variants() -> Vec<HashVariant> {
    HashVariant::ALL.to_vec()
}

/// Describes a scheme.
pub fn describe(scheme: Scheme) -> SchemeInfo {
    match scheme {
        Scheme::Sphincs => SchemeInfo {
            scheme,
            family: scheme.family(),
            one_time: false,
            default_level: DEFAULT_SECURITY_LEVEL,
            levels: vec![
                LevelParams {
                    level: 1,
                    parameter_set: "SPHINCS+-SHAKE-128f-simple",
                    public_key_size: sphincsshake128fsimple::public_key_bytes(),
                    secret_key_size: sphincsshake128fsimple::secret_key_bytes(),
                    signature_size: sphincsshake128fsimple::signature_bytes(),
                },
                LevelParams {
                    level: 3,
                    parameter_set: "SPHINCS+-SHAKE-192f-simple",
                    public_key_size: sphincsshake192fsimple::public_key_bytes(),
                    secret_key_size: sphincsshake192fsimple::secret_key_bytes(),
                    signature_size: sphincsshake192fsimple::signature_bytes(),
                },
                LevelParams {
                    level: 5,
                    parameter_set: "SPHINCS+-SHAKE-256f-simple",
                    public_key_size: sphincsshake256fsimple::public_key_bytes(),
                    secret_key_size: sphincsshake256fsimple::secret_key_bytes(),
                    signature_size: sphincsshake256fsimple::signature_bytes(),
                },
            ],
        },
        Scheme::Dilithium => SchemeInfo {
            scheme,
            family: scheme.family(),
            one_time: false,
            default_level: DEFAULT_SECURITY_LEVEL,
            levels: vec![
                LevelParams {
                    level: 2,
                    parameter_set: "Dilithium2",
                    public_key_size: dilithium2::public_key_bytes(),
                    secret_key_size: dilithium2::secret_key_bytes(),
                    signature_size: dilithium2::signature_bytes(),
                },
                LevelParams {
                    level: 3,
                    parameter_set: "Dilithium3",
                    public_key_size: dilithium3::public_key_bytes(),
                    secret_key_size: dilithium3::secret_key_bytes(),
                    signature_size: dilithium3::signature_bytes(),
                },
                LevelParams {
                    level: 5,
                    parameter_set: "Dilithium5",
                    public_key_size: dilithium5::public_key_bytes(),
                    secret_key_size: dilithium5::secret_key_bytes(),
                    signature_size: dilithium5::signature_bytes(),
                },
            ],
        },
        Scheme::Lamport => SchemeInfo {
            scheme,
            family: scheme.family(),
            one_time: true,
            default_level: DEFAULT_SECURITY_LEVEL,
            levels: [(1u8, "Lamport-SHAKE256-32"), (3, "Lamport-SHAKE256-48"), (5, "Lamport-SHAKE256-64")]
                .into_iter()
                .filter_map(|(level, parameter_set)| {
                    let n = lamport::hash_size_for_level(level)?;
                    Some(LevelParams {
                        level,
                        parameter_set,
                        public_key_size: lamport::key_size(n),
                        secret_key_size: lamport::key_size(n),
                        signature_size: lamport::signature_size(n),
                    })
                })
                .collect(),
        },
    }
}

/// Resolves a free-form scheme name and describes it.
///
/// # Errors
/// `UnknownScheme` for unregistered identifiers.
pub fn describe_name(name: &str) -> Result<SchemeInfo> {
    let scheme: Scheme = name.parse()?;
    Ok(describe(scheme))
}

/// Checks a (scheme, level) pair and returns its parameters.
///
/// # Errors
/// `InvalidParameters` if the level is not supported by the scheme.
pub fn validate(scheme: Scheme, level: u8) -> Result<LevelParams> {
    let info = describe(scheme);
    info.params(level).cloned().ok_or_else(|| {
        WalletError::invalid(format!(
            "security level {level} is not supported by {scheme} (supported: {:?})",
            info.supported_levels()
        ))
    })
}

/// Infers the level of a public key from its length.
pub fn level_for_public_key(scheme: Scheme, len: usize) -> Option<u8> {
    describe(scheme)
        .levels
        .iter()
        .find(|l| l.public_key_size == len)
        .map(|l| l.level)
}

/// Infers the level of a secret key from its length.
pub fn level_for_secret_key(scheme: Scheme, len: usize) -> Option<u8> {
    describe(scheme)
        .levels
        .iter()
        .find(|l| l.secret_key_size == len)
        .map(|l| l.level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_list_schemes_order() {
        assert_eq!(
            list_schemes(),
            vec![Scheme::Sphincs, Scheme::Dilithium, Scheme::Lamport]
        );
        assert_eq!(list_hash_variants().len(), 4);
    }

    #[test_case(Scheme::Sphincs, &[1, 3, 5])]
    #[test_case(Scheme::Dilithium, &[2, 3, 5])]
    #[test_case(Scheme::Lamport, &[1, 3, 5])]
    fn test_supported_levels(scheme: Scheme, levels: &[u8]) {
        assert_eq!(describe(scheme).supported_levels(), levels);
        assert!(describe(scheme).params(DEFAULT_SECURITY_LEVEL).is_some());
    }

    #[test]
    fn test_known_sizes() {
        let d = describe(Scheme::Dilithium);
        assert_eq!(d.params(2).unwrap().public_key_size, 1312);
        assert_eq!(d.params(3).unwrap().public_key_size, 1952);
        assert_eq!(d.params(5).unwrap().public_key_size, 2592);

        let s = describe(Scheme::Sphincs);
        assert_eq!(s.params(1).unwrap().public_key_size, 32);
        assert_eq!(s.params(5).unwrap().public_key_size, 64);

        let l = describe(Scheme::Lamport);
        assert_eq!(l.key_size(), 36_864);
        assert!(l.one_time);
    }

    #[test]
    fn test_validate_gate() {
        assert!(validate(Scheme::Dilithium, 3).is_ok());
        let err = validate(Scheme::Dilithium, 1).unwrap_err();
        assert!(matches!(err, WalletError::InvalidParameters(_)));
        assert!(validate(Scheme::Sphincs, 2).is_err());
        assert!(validate(Scheme::Lamport, 0).is_err());
    }

    #[test]
    fn test_describe_unknown_name() {
        assert!(matches!(
            describe_name("rainbow"),
            Err(WalletError::UnknownScheme(_))
        ));
        assert_eq!(describe_name("Dilithium").unwrap().scheme, Scheme::Dilithium);
    }

    #[test]
    fn test_key_lengths_identify_levels() {
        for scheme in list_schemes() {
            for params in describe(scheme).levels {
                assert_eq!(
                    level_for_public_key(scheme, params.public_key_size),
                    Some(params.level)
                );
                assert_eq!(
                    level_for_secret_key(scheme, params.secret_key_size),
                    Some(params.level)
                );
            }
        }
        assert_eq!(level_for_public_key(Scheme::Dilithium, 7), None);
    }
}
