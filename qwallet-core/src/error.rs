//! Error types for qwallet.
//!
//! Every fallible operation returns [`WalletError`]. Callers that need to
//! report or branch on failures use [`WalletError::kind`], which collapses
//! the variants onto the small taxonomy shown to users.

use thiserror::Error;

/// Result type alias using `WalletError`.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Main error type for all qwallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    // ═══════════════════════════════════════════════════════════════════════════
    // INPUT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Bad scheme/level combination, amount, name or configuration value.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Scheme identifier that the registry does not know.
    #[error("Unknown scheme: {0}")]
    UnknownScheme(String),

    /// Transfer amount that is zero or negative.
    #[error("Insufficient amount: {0}")]
    InsufficientAmount(String),

    /// Address string that is neither quantum-native nor ledger-native.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Wallet or backup does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Wallet already exists and overwrite was not requested.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Wrong password or corrupted wallet data. The two are never distinguished.
    #[error("Decryption failed: wrong password or corrupted wallet data")]
    DecryptionFailed,

    /// Storage layout problem that is neither missing data nor a decryption failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // CRYPTOGRAPHIC ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// The signature primitive library failed.
    #[error("Primitive failure: {0}")]
    PrimitiveFailure(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // LEDGER ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Transient network failure (timeout, connection, overloaded node).
    #[error("Network error: {0}")]
    Network(String),

    /// The ledger definitively refused the request.
    #[error("Rejected by ledger: {0}")]
    Rejected(String),

    /// Illegal history status transition.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },
}

/// Reportable error kinds.
///
/// This is the taxonomy printed by the CLI and used to pick an exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// User input error; recoverable by re-prompting.
    InvalidParameters,
    /// Scheme identifier not in the registry.
    UnknownScheme,
    /// Amount not strictly positive.
    InsufficientAmount,
    /// Wallet lookup failed.
    NotFound,
    /// Wallet name collision.
    AlreadyExists,
    /// Wrong password or corrupt store.
    DecryptionFailed,
    /// Address validation failed.
    InvalidAddress,
    /// Cryptographic library failure.
    PrimitiveFailure,
    /// Transient network failure.
    NetworkError,
    /// Definitive ledger rejection.
    Rejected,
    /// Local storage failure.
    Storage,
}

impl ErrorKind {
    /// Stable identifier used in user-visible output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidParameters => "InvalidParameters",
            Self::UnknownScheme => "UnknownScheme",
            Self::InsufficientAmount => "InsufficientAmount",
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::DecryptionFailed => "DecryptionFailed",
            Self::InvalidAddress => "InvalidAddress",
            Self::PrimitiveFailure => "PrimitiveFailure",
            Self::NetworkError => "NetworkError",
            Self::Rejected => "Rejected",
            Self::Storage => "Storage",
        }
    }

    /// Process exit code for this kind. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidParameters | Self::UnknownScheme | Self::InsufficientAmount => 2,
            Self::InvalidAddress => 3,
            Self::NotFound | Self::AlreadyExists => 4,
            Self::DecryptionFailed => 5,
            Self::PrimitiveFailure => 6,
            Self::NetworkError => 7,
            Self::Rejected => 8,
            Self::Storage => 9,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WalletError {
    /// Maps this error onto its reportable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameters(_) | Self::InvalidTransition { .. } => {
                ErrorKind::InvalidParameters
            }
            Self::UnknownScheme(_) => ErrorKind::UnknownScheme,
            Self::InsufficientAmount(_) => ErrorKind::InsufficientAmount,
            Self::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::DecryptionFailed => ErrorKind::DecryptionFailed,
            Self::Storage(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Storage,
            Self::PrimitiveFailure(_) => ErrorKind::PrimitiveFailure,
            Self::Network(_) => ErrorKind::NetworkError,
            Self::Rejected(_) => ErrorKind::Rejected,
        }
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns true if this error is caused by user input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidParameters
                | ErrorKind::UnknownScheme
                | ErrorKind::InsufficientAmount
                | ErrorKind::InvalidAddress
                | ErrorKind::NotFound
                | ErrorKind::AlreadyExists
        )
    }

    /// Creates an invalid parameters error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    /// Creates a primitive failure error.
    pub fn primitive(msg: impl Into<String>) -> Self {
        Self::PrimitiveFailure(msg.into())
    }

    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WalletError::InvalidParameters("level 4 not supported".into());
        assert_eq!(err.to_string(), "Invalid parameters: level 4 not supported");

        let err = WalletError::DecryptionFailed;
        assert!(err.to_string().contains("wrong password"));
    }

    #[test]
    fn test_only_network_errors_are_recoverable() {
        assert!(WalletError::network("timeout").is_recoverable());
        assert!(!WalletError::Rejected("insufficient funds".into()).is_recoverable());
        assert!(!WalletError::DecryptionFailed.is_recoverable());
        assert!(!WalletError::primitive("keygen").is_recoverable());
    }

    #[test]
    fn test_kind_mapping() {
        let io = WalletError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.kind(), ErrorKind::Storage);

        let transition = WalletError::InvalidTransition {
            from: "confirmed".into(),
            to: "pending".into(),
        };
        assert_eq!(transition.kind(), ErrorKind::InvalidParameters);
        assert_eq!(WalletError::Network("x".into()).kind(), ErrorKind::NetworkError);
    }

    #[test]
    fn test_exit_codes_are_nonzero() {
        let kinds = [
            ErrorKind::InvalidParameters,
            ErrorKind::UnknownScheme,
            ErrorKind::InsufficientAmount,
            ErrorKind::NotFound,
            ErrorKind::AlreadyExists,
            ErrorKind::DecryptionFailed,
            ErrorKind::InvalidAddress,
            ErrorKind::PrimitiveFailure,
            ErrorKind::NetworkError,
            ErrorKind::Rejected,
            ErrorKind::Storage,
        ];
        for kind in kinds {
            assert_ne!(kind.exit_code(), 0, "{kind}");
        }
    }

    #[test]
    fn test_user_errors() {
        assert!(WalletError::InvalidAddress("bad".into()).is_user_error());
        assert!(!WalletError::Network("x".into()).is_user_error());
    }
}
