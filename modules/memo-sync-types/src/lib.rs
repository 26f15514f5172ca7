//! Shared types for the memo sync service and anything that reads its store file.

use serde::{Deserialize, Serialize};

// =====================================================
// Well-known Values
// =====================================================

/// Account whose transaction history carries the memos
pub const DEFAULT_PDA_ADDRESS: &str = "HQvMbrAMGjMkcobUV56MN9zaryPo9NarLddrEfc1wmLP";

/// SPL Memo program ids (v1 and v2)
pub const MEMO_PROGRAM_IDS: &[&str] = &[
    "Memo1UhkJRfHyvLMcVucJwxXeuD728EqVDDwQDxFMNo",
    "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr",
];

/// Program tag used by `jsonParsed` encoding for memo instructions
pub const SPL_MEMO_PROGRAM_TAG: &str = "spl-memo";

/// Public RPC endpoints, ordered by reliability
pub const DEFAULT_RPC_ENDPOINTS: &[&str] = &[
    "https://api.mainnet-beta.solana.com",
    "https://solana.drpc.org",
    "https://rpc.ankr.com/solana",
    "https://solana-api.projectserum.com",
];

pub const UNKNOWN_AUTHOR: &str = "Unknown";

pub const DEFAULT_COMMITMENT: &str = "confirmed";

// =====================================================
// Store Types
// =====================================================

/// A memo captured from a ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub signature: String,
    pub author: String,
    pub content: String,
    /// Block time in milliseconds since the epoch
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
}

impl Memo {
    /// Sort key for display order; memos without a block time sort as oldest
    pub fn sort_timestamp(&self) -> i64 {
        self.timestamp.unwrap_or(0)
    }
}

/// Statistics for the most recent sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    pub run_time: String,
    pub new_memos_found: usize,
    pub total_after_merge: usize,
    pub rpc_requests: u64,
}

/// The persisted store file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoStore {
    #[serde(default)]
    pub pda_address: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub total_memos: usize,
    #[serde(default)]
    pub last_fetch_stats: FetchStats,
    pub memos: Vec<Memo>,
}

// =====================================================
// JSON-RPC Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    pub fn new(method: &str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: 1,
            method: method.to_string(),
            params,
        }
    }
}

/// Entry returned by `getSignaturesForAddress`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: Option<u64>,
    /// Set when the transaction failed on chain
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

impl SignatureInfo {
    pub fn is_failed(&self) -> bool {
        matches!(&self.err, Some(v) if !v.is_null())
    }
}
