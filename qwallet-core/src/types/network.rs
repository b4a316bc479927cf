//! Ledger networks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Ledger cluster a wallet is bound to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production cluster
    Mainnet,
    /// Public test cluster
    #[default]
    Testnet,
    /// Public development cluster
    Devnet,
    /// Local validator
    Local,
}

impl Network {
    /// All networks.
    pub const ALL: [Network; 4] = [
        Network::Mainnet,
        Network::Testnet,
        Network::Devnet,
        Network::Local,
    ];

    /// Canonical identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
            Self::Local => "local",
        }
    }

    /// Default JSON-RPC endpoint.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.mainnet-beta.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Local => "http://localhost:8899",
        }
    }

    /// Faucet airdrops are only valid off the production cluster.
    pub fn allows_airdrop(&self) -> bool {
        !matches!(self, Self::Mainnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            "local" | "localnet" | "localhost" => Ok(Self::Local),
            other => Err(WalletError::invalid(format!("unknown network: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airdrop_policy() {
        assert!(!Network::Mainnet.allows_airdrop());
        assert!(Network::Testnet.allows_airdrop());
        assert!(Network::Devnet.allows_airdrop());
        assert!(Network::Local.allows_airdrop());
    }

    #[test]
    fn test_parse() {
        assert_eq!("mainnet-beta".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("Devnet".parse::<Network>().unwrap(), Network::Devnet);
        assert!("moon".parse::<Network>().is_err());
        for n in Network::ALL {
            assert_eq!(n.as_str().parse::<Network>().unwrap(), n);
        }
    }
}
