//! Ethereum JSON-RPC client
//!
//! One client type serves both seams: as a [`LedgerReader`] it issues
//! `eth_call` against the tally contract, as a [`WalletProvider`] it relies on
//! the endpoint to hold and unlock the voter's account (a browser-wallet
//! bridge or a dev node).
//!
//! ```text
//! request_accounts   eth_requestAccounts ─(unsupported)─▶ eth_accounts
//! tallies            eth_call(getAllOptions)
//! send_vote          eth_estimateGas ─▶ eth_sendTransaction
//! wait_for_receipt   eth_getTransactionReceipt, polled until mined or timeout
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, B256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::abi::{ContractInterface, decode_revert_reason};
use super::{LedgerReader, Receipt, TxHash, VoteCall, WalletProvider};
use crate::error::{ConnectionError, LedgerError, StartupError};

/// JSON-RPC "method not found"
const METHOD_NOT_FOUND: i64 = -32601;
/// EIP-1193 "user rejected request"
const USER_REJECTED: i64 = 4001;

/// Connection settings for [`EthRpcClient`]
#[derive(Debug, Clone)]
pub struct EthRpcConfig {
    /// Endpoint URL (e.g., "http://127.0.0.1:8545")
    pub url: String,
    /// Verifier/tally contract
    pub contract: Address,
    /// How long to wait for a receipt
    pub confirmation_timeout: Duration,
    /// Receipt polling interval
    pub poll_interval: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl EthRpcConfig {
    pub fn new(url: impl Into<String>, contract: Address) -> Self {
        Self {
            url: url.into(),
            contract,
            confirmation_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// JSON-RPC client for the voting contract
pub struct EthRpcClient {
    config: EthRpcConfig,
    interface: Arc<ContractInterface>,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl EthRpcClient {
    pub fn new(config: EthRpcConfig, interface: Arc<ContractInterface>) -> Result<Self, StartupError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StartupError::Http(e.to_string()))?;

        Ok(Self::with_client(config, interface, client))
    }

    /// Use a preconfigured HTTP client; `config.request_timeout` is not applied
    pub fn with_client(
        config: EthRpcConfig,
        interface: Arc<ContractInterface>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            config,
            interface,
            client,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn contract(&self) -> Address {
        self.config.contract
    }

    pub fn interface(&self) -> &ContractInterface {
        &self.interface
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        debug!(method, id, "rpc request");

        let response = self
            .client
            .post(&self.config.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method}: {e}")))?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "{method}: HTTP {}",
                response.status()
            )));
        }

        let payload: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Decode(format!("{method}: {e}")))?;

        if let Some(err) = payload.error {
            return Err(rpc_failure(err));
        }

        let result = payload.result.unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| LedgerError::Decode(format!("{method}: {e}")))
    }

    async fn accounts(&self, method: &str) -> Result<Vec<Address>, LedgerError> {
        let raw: Vec<String> = self.request(method, json!([])).await?;
        raw.iter()
            .map(|account| {
                account
                    .parse::<Address>()
                    .map_err(|e| LedgerError::Decode(format!("account {account}: {e}")))
            })
            .collect()
    }

    async fn fetch_receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, LedgerError> {
        let raw: Option<RawReceipt> = self
            .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        let block_number = raw.block_number.as_deref().map(parse_quantity).transpose()?;
        let Some(block_number) = block_number else {
            // Pending receipts from some nodes carry no block yet
            return Ok(None);
        };

        Ok(Some(Receipt {
            tx_hash: parse_hash(&raw.transaction_hash)?,
            block_number: Some(block_number),
            success: raw.status.as_deref().map_or(true, |s| parse_quantity(s) == Ok(1)),
        }))
    }
}

impl WalletProvider for EthRpcClient {
    async fn request_accounts(&self) -> Result<Vec<Address>, ConnectionError> {
        let accounts = match self.accounts("eth_requestAccounts").await {
            Err(LedgerError::Rpc {
                code: METHOD_NOT_FOUND,
                ..
            }) => {
                debug!("eth_requestAccounts unsupported, falling back to eth_accounts");
                self.accounts("eth_accounts").await
            }
            other => other,
        };

        match accounts {
            Ok(accounts) if accounts.is_empty() => Err(ConnectionError::ConnectionRejected(
                "wallet exposed no accounts".to_string(),
            )),
            Ok(accounts) => Ok(accounts),
            Err(LedgerError::Rpc {
                code: USER_REJECTED,
                message,
            }) => Err(ConnectionError::ConnectionRejected(message)),
            Err(LedgerError::Transport(reason)) => Err(ConnectionError::NoWalletDetected(reason)),
            Err(other) => Err(ConnectionError::ConnectionRejected(other.to_string())),
        }
    }

    async fn send_vote(&self, from: Address, call: &VoteCall) -> Result<TxHash, LedgerError> {
        let data = self
            .interface
            .encode_vote(call)
            .map_err(|e| LedgerError::Encode(e.to_string()))?;

        let mut tx = json!({
            "from": from.to_string(),
            "to": self.config.contract.to_string(),
            "data": format!("0x{}", hex::encode(&data)),
        });

        // A revert here carries the contract's reason without spending gas
        let gas: String = self.request("eth_estimateGas", json!([tx.clone()])).await?;
        tx["gas"] = Value::String(gas);

        let hash: String = self.request("eth_sendTransaction", json!([tx])).await?;
        let tx_hash = parse_hash(&hash)?;
        info!(%tx_hash, "vote transaction sent");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt, LedgerError> {
        let poll = async {
            loop {
                match self.fetch_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => {}
                    Err(LedgerError::Transport(e)) => warn!("receipt poll failed: {}", e),
                    Err(e) => return Err(e),
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };

        timeout(self.config.confirmation_timeout, poll)
            .await
            .map_err(|_| {
                LedgerError::Timeout(format!(
                    "receipt of {tx_hash} after {}s",
                    self.config.confirmation_timeout.as_secs()
                ))
            })?
    }
}

impl LedgerReader for EthRpcClient {
    async fn tallies(&self) -> Result<Vec<u64>, LedgerError> {
        let data = self
            .interface
            .encode_tally_query()
            .map_err(|e| LedgerError::Encode(e.to_string()))?;

        let call = json!({
            "to": self.config.contract.to_string(),
            "data": format!("0x{}", hex::encode(&data)),
        });
        let output: String = self.request("eth_call", json!([call, "latest"])).await?;
        let bytes = decode_hex(&output)?;

        self.interface
            .decode_tallies(&bytes)
            .map_err(|e| LedgerError::Decode(e.to_string()))
    }
}

fn rpc_failure(err: RpcErrorObject) -> LedgerError {
    let reason = err
        .data
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|data| decode_hex(data).ok())
        .and_then(|bytes| decode_revert_reason(&bytes));

    if let Some(reason) = reason {
        return LedgerError::Reverted(reason);
    }
    if err.message.to_ascii_lowercase().contains("revert") {
        return LedgerError::Reverted(err.message);
    }
    LedgerError::Rpc {
        code: err.code,
        message: err.message,
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, LedgerError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| LedgerError::Decode(format!("hex {value}: {e}")))
}

fn parse_quantity(value: &str) -> Result<u64, LedgerError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::Decode(format!("quantity {value}: {e}")))
}

fn parse_hash(value: &str) -> Result<B256, LedgerError> {
    value
        .parse::<B256>()
        .map_err(|e| LedgerError::Decode(format!("hash {value}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use alloy_primitives::U256;
    use shadowvote_ballot::{PublicSignals, VerifierProof};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use crate::error::{Rejection, RejectionKind};
    use crate::pipeline::send_and_confirm;

    const VOTING_ABI: &str = r#"[
        {"type": "function", "name": "getAllOptions", "inputs": [],
         "outputs": [{"name": "", "type": "uint256[]"}], "stateMutability": "view"},
        {"type": "function", "name": "vote", "inputs": [
            {"name": "_pA", "type": "uint256[2]"},
            {"name": "_pB", "type": "uint256[2][2]"},
            {"name": "_pC", "type": "uint256[2]"},
            {"name": "_pubSignals", "type": "uint256[2]"}
         ], "outputs": [], "stateMutability": "nonpayable"}
    ]"#;

    const TX_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    // Error("Nullifier already used")
    const NULLIFIER_REVERT: &str = concat!(
        "0x08c379a0",
        "0000000000000000000000000000000000000000000000000000000000000020",
        "0000000000000000000000000000000000000000000000000000000000000016",
        "4e756c6c696669657220616c7265616479207573656400000000000000000000"
    );

    type Reply = (u16, Value);

    fn ok(result: Value) -> Reply {
        (200, json!({"jsonrpc": "2.0", "id": 1, "result": result}))
    }

    fn rpc_error(code: i64, message: &str, data: Option<&str>) -> Reply {
        let mut error = json!({"code": code, "message": message});
        if let Some(data) = data {
            error["data"] = Value::String(data.to_string());
        }
        (200, json!({"jsonrpc": "2.0", "id": 1, "error": error}))
    }

    fn mined(status: &str) -> Reply {
        ok(json!({"transactionHash": TX_HASH, "blockNumber": "0x10", "status": status}))
    }

    async fn read_body(socket: &mut TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return Vec::new();
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let start = end + 4;
            while buf.len() < start + length {
                let n = socket.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            return buf[start..].to_vec();
        }
    }

    /// Answer each JSON-RPC request by method name on a local port
    async fn serve<F>(reply: F) -> String
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let reply = Arc::new(reply);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let reply = Arc::clone(&reply);
                tokio::spawn(async move {
                    let body = read_body(&mut socket).await;
                    let Ok(request) = serde_json::from_slice::<Value>(&body) else {
                        return;
                    };
                    let (status, payload) = reply(request["method"].as_str().unwrap_or_default());
                    let payload = payload.to_string();
                    let response = format!(
                        "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
                        payload.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        url
    }

    fn client(url: String) -> EthRpcClient {
        let mut config = EthRpcConfig::new(url, Address::repeat_byte(0xcc));
        config.poll_interval = Duration::from_millis(10);
        config.confirmation_timeout = Duration::from_millis(300);
        let http = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let interface = Arc::new(ContractInterface::from_json(VOTING_ABI).unwrap());
        EthRpcClient::with_client(config, interface, http)
    }

    fn call() -> VoteCall {
        let w = |v: u64| U256::from(v);
        VoteCall {
            proof: VerifierProof {
                a: [w(1), w(2)],
                b: [[w(3), w(4)], [w(5), w(6)]],
                c: [w(7), w(8)],
            },
            public_signals: PublicSignals::new(vec![w(9), w(1)]),
        }
    }

    fn hash() -> TxHash {
        parse_hash(TX_HASH).unwrap()
    }

    #[tokio::test]
    async fn test_accounts_fall_back_when_request_unsupported() {
        let url = serve(|method| match method {
            "eth_requestAccounts" => rpc_error(METHOD_NOT_FOUND, "method not found", None),
            "eth_accounts" => ok(json!(["0x00000000000000000000000000000000000000aa"])),
            _ => (500, json!({})),
        })
        .await;

        let accounts = client(url).request_accounts().await.unwrap();
        assert_eq!(accounts, vec![Address::with_last_byte(0xaa)]);
    }

    #[tokio::test]
    async fn test_user_rejection_maps_to_connection_rejected() {
        let url = serve(|_| rpc_error(USER_REJECTED, "User rejected the request.", None)).await;

        let err = client(url).request_accounts().await.unwrap_err();
        assert_eq!(
            err,
            ConnectionError::ConnectionRejected("User rejected the request.".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_account_list_is_rejected() {
        let url = serve(|_| ok(json!([]))).await;

        let err = client(url).request_accounts().await.unwrap_err();
        assert!(matches!(err, ConnectionError::ConnectionRejected(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_no_wallet() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client(url).request_accounts().await.unwrap_err();
        assert!(matches!(err, ConnectionError::NoWalletDetected(_)));
    }

    #[tokio::test]
    async fn test_tallies_from_eth_call() {
        let url = serve(|method| match method {
            "eth_call" => {
                let mut out = String::from("0x");
                for word in [0x20u64, 3, 5, 3, 2] {
                    out.push_str(&hex::encode(U256::from(word).to_be_bytes::<32>()));
                }
                ok(Value::String(out))
            }
            _ => (500, json!({})),
        })
        .await;

        assert_eq!(client(url).tallies().await.unwrap(), vec![5, 3, 2]);
    }

    #[tokio::test]
    async fn test_estimate_revert_stops_before_sending() {
        let sends = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&sends);
        let url = serve(move |method| match method {
            "eth_estimateGas" => rpc_error(3, "execution reverted", Some(NULLIFIER_REVERT)),
            "eth_sendTransaction" => {
                counter.fetch_add(1, Ordering::SeqCst);
                ok(json!(TX_HASH))
            }
            _ => (500, json!({})),
        })
        .await;

        let err = client(url)
            .send_vote(Address::with_last_byte(0xaa), &call())
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::Reverted("Nullifier already used".to_string()));
        assert_eq!(Rejection::from(err).kind, RejectionKind::NullifierReused);
        assert_eq!(sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_vote_returns_hash() {
        let url = serve(|method| match method {
            "eth_estimateGas" => ok(json!("0x5208")),
            "eth_sendTransaction" => ok(json!(TX_HASH)),
            _ => (500, json!({})),
        })
        .await;

        let tx_hash = client(url)
            .send_vote(Address::with_last_byte(0xaa), &call())
            .await
            .unwrap();
        assert_eq!(tx_hash, hash());
    }

    #[tokio::test]
    async fn test_receipt_polling_skips_transport_errors() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);
        let url = serve(move |_| match counter.fetch_add(1, Ordering::SeqCst) {
            0 => (503, json!({})),
            1 => ok(Value::Null),
            _ => mined("0x1"),
        })
        .await;

        let receipt = client(url).wait_for_receipt(hash()).await.unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_status_is_reverted() {
        let url = serve(|method| match method {
            "eth_estimateGas" => ok(json!("0x5208")),
            "eth_sendTransaction" => ok(json!(TX_HASH)),
            "eth_getTransactionReceipt" => mined("0x0"),
            _ => (500, json!({})),
        })
        .await;

        let rejection = send_and_confirm(&client(url), Address::with_last_byte(0xaa), &call())
            .await
            .unwrap_err();
        assert_eq!(rejection.kind, RejectionKind::Reverted);
        assert!(rejection.message.contains("block 16"));
    }

    #[tokio::test]
    async fn test_receipt_timeout() {
        let url = serve(|_| ok(Value::Null)).await;

        let err = client(url).wait_for_receipt(hash()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Timeout(_)));
        assert_eq!(Rejection::from(err).kind, RejectionKind::Timeout);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x1"), Ok(1));
        assert_eq!(parse_quantity("0x5208"), Ok(21000));
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_revert_data_is_decoded() {
        // Error("Nullifier already used")
        let data = concat!(
            "0x08c379a0",
            "0000000000000000000000000000000000000000000000000000000000000020",
            "0000000000000000000000000000000000000000000000000000000000000016",
            "4e756c6c696669657220616c7265616479207573656400000000000000000000"
        );
        let err = rpc_failure(RpcErrorObject {
            code: 3,
            message: "execution reverted".to_string(),
            data: Some(Value::String(data.to_string())),
        });
        assert_eq!(err, LedgerError::Reverted("Nullifier already used".to_string()));
    }

    #[test]
    fn test_plain_rpc_errors_keep_code() {
        let err = rpc_failure(RpcErrorObject {
            code: -32000,
            message: "insufficient funds for gas * price + value".to_string(),
            data: None,
        });
        assert!(matches!(err, LedgerError::Rpc { code: -32000, .. }));
    }

    #[test]
    fn test_receipt_shape() {
        let raw: RawReceipt = serde_json::from_value(json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockNumber": "0x10",
            "status": "0x1"
        }))
        .unwrap();
        assert_eq!(raw.block_number.as_deref(), Some("0x10"));
        assert!(parse_hash(&raw.transaction_hash).is_ok());
    }
}
