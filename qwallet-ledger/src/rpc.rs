//! JSON-RPC client for the remote ledger.
//!
//! Error classification:
//!
//! | Condition                                   | Error      |
//! |---------------------------------------------|------------|
//! | connect / timeout / HTTP 429 / HTTP 5xx     | `Network`  |
//! | node unhealthy, block unavailable, internal | `Network`  |
//! | any other JSON-RPC error (e.g. preflight)   | `Rejected` |
//! | other HTTP 4xx                              | `Rejected` |

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use qwallet_core::constants::BLOCKHASH_SIZE;
use qwallet_core::context::{Commitment, WalletContext};
use qwallet_core::error::{Result, WalletError};
use qwallet_core::traits::LedgerRpc;
use qwallet_core::types::{Amount, ConfirmationStatus, LedgerAddress, Network};

/// JSON-RPC error codes that indicate a transient node condition.
const TRANSIENT_RPC_CODES: [i64; 5] = [
    -32603, // internal error
    -32004, // block not available
    -32005, // node unhealthy
    -32014, // block status not yet available
    -32016, // minimum context slot not reached
];

/// Client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcConfig {
    /// Endpoint URL
    pub url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Commitment used for reads and confirmation
    pub commitment: Commitment,
}

impl RpcConfig {
    /// Configuration for `network`, honouring the context's URL override.
    pub fn for_network(ctx: &WalletContext, network: Network) -> Self {
        Self {
            url: ctx
                .rpc_url
                .clone()
                .unwrap_or_else(|| network.default_rpc_url().to_string()),
            timeout: ctx.request_timeout,
            commitment: ctx.commitment,
        }
    }
}

/// Ledger client speaking JSON-RPC 2.0 over HTTP.
#[derive(Debug)]
pub struct JsonRpcClient {
    config: RpcConfig,
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Creates a client.
    ///
    /// # Errors
    /// `InvalidParameters` for an unparsable URL; `Network` if the HTTP
    /// client cannot be built.
    pub fn new(config: RpcConfig) -> Result<Self> {
        url::Url::parse(&config.url)
            .map_err(|e| WalletError::invalid(format!("invalid RPC URL '{}': {e}", config.url)))?;
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WalletError::network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            config,
            http_client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Makes one JSON-RPC call and returns its `result`.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http_client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| WalletError::network(format!("{method}: {e}")))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(WalletError::network(format!("{method}: HTTP {status}")));
        }
        if !status.is_success() {
            return Err(WalletError::Rejected(format!("{method}: HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| WalletError::network(format!("{method}: malformed response: {e}")))?;

        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown RPC error");
            debug!(method, code, error = %message, "RPC error");
            return Err(classify_rpc_error(method, code, message));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| WalletError::network(format!("{method}: response has no result")))
    }

    fn commitment_config(&self) -> Value {
        json!({ "commitment": self.config.commitment.as_str() })
    }
}

fn classify_rpc_error(method: &str, code: i64, message: &str) -> WalletError {
    if TRANSIENT_RPC_CODES.contains(&code) {
        WalletError::network(format!("{method}: {message} ({code})"))
    } else {
        WalletError::Rejected(format!("{method}: {message} ({code})"))
    }
}

/// Maps one `getSignatureStatuses` entry onto a local status.
fn parse_status(entry: &Value, commitment: Commitment) -> ConfirmationStatus {
    if entry.is_null() {
        return ConfirmationStatus::Pending;
    }
    if entry.get("err").is_some_and(|e| !e.is_null()) {
        return ConfirmationStatus::Failed;
    }
    let reached = match entry.get("confirmationStatus").and_then(Value::as_str) {
        Some("finalized") => true,
        Some("confirmed") => commitment == Commitment::Confirmed,
        _ => false,
    };
    if reached {
        ConfirmationStatus::Confirmed
    } else {
        ConfirmationStatus::Pending
    }
}

#[async_trait]
impl LedgerRpc for JsonRpcClient {
    #[instrument(skip(self), fields(address = %address))]
    async fn get_balance(&self, address: &LedgerAddress) -> Result<Amount> {
        let result = self
            .call(
                "getBalance",
                json!([address.to_base58(), self.commitment_config()]),
            )
            .await?;
        let lamports = result
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| WalletError::network("getBalance: missing value"))?;
        Ok(Amount::from_lamports(lamports))
    }

    #[instrument(skip(self), fields(address = %address, lamports = amount.lamports()))]
    async fn request_airdrop(&self, address: &LedgerAddress, amount: Amount) -> Result<String> {
        let result = self
            .call(
                "requestAirdrop",
                json!([address.to_base58(), amount.lamports(), self.commitment_config()]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::network("requestAirdrop: result is not a signature"))
    }

    #[instrument(skip(self, transaction), fields(len = transaction.len()))]
    async fn send_raw_transaction(&self, transaction: &[u8]) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(transaction);
        let result = self
            .call(
                "sendTransaction",
                json!([
                    encoded,
                    {
                        "encoding": "base64",
                        "preflightCommitment": self.config.commitment.as_str(),
                    }
                ]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::network("sendTransaction: result is not a signature"))
    }

    #[instrument(skip(self))]
    async fn get_signature_status(&self, signature: &str) -> Result<ConfirmationStatus> {
        let result = self
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;
        let entry = result
            .get("value")
            .and_then(Value::as_array)
            .and_then(|values| values.first())
            .ok_or_else(|| WalletError::network("getSignatureStatuses: missing value"))?;
        Ok(parse_status(entry, self.config.commitment))
    }

    #[instrument(skip(self))]
    async fn get_latest_blockhash(&self) -> Result<[u8; BLOCKHASH_SIZE]> {
        let result = self
            .call("getLatestBlockhash", json!([self.commitment_config()]))
            .await?;
        let encoded = result
            .get("value")
            .and_then(|v| v.get("blockhash"))
            .and_then(Value::as_str)
            .ok_or_else(|| WalletError::network("getLatestBlockhash: missing blockhash"))?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| WalletError::network(format!("getLatestBlockhash: {e}")))?;
        bytes.try_into().map_err(|bytes: Vec<u8>| {
            warn!(len = bytes.len(), "Blockhash has unexpected length");
            WalletError::network("getLatestBlockhash: blockhash is not 32 bytes")
        })
    }
}
