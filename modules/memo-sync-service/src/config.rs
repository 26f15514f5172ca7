//! Sync configuration
//!
//! Target address, RPC endpoints, and paging/rate-limit settings.

use memo_sync_types::{DEFAULT_PDA_ADDRESS, DEFAULT_RPC_ENDPOINTS, MEMO_PROGRAM_IDS};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_MAX_NEW_MEMOS: usize = 50;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FETCH_DELAY_MS: u64 = 300;
const DEFAULT_RATE_LIMIT_BACKOFF_MS: u64 = 2000;

const DEFAULT_STORE_FILE: &str = "memos.json";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Account whose history is scanned
    pub pda_address: String,
    /// Program ids whose instructions carry memo payloads
    pub memo_programs: Vec<String>,
    /// RPC endpoints in preference order
    pub rpc_endpoints: Vec<String>,
    /// Signatures requested per `getSignaturesForAddress` page
    pub page_size: usize,
    /// Stop a run once this many new memos were captured
    pub max_new_memos: usize,
    pub request_timeout: Duration,
    /// Pause before every transaction fetch
    pub fetch_delay: Duration,
    /// Pause after an HTTP 429 before moving to the next endpoint
    pub rate_limit_backoff: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pda_address: DEFAULT_PDA_ADDRESS.to_string(),
            memo_programs: MEMO_PROGRAM_IDS.iter().map(|s| s.to_string()).collect(),
            rpc_endpoints: DEFAULT_RPC_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            page_size: DEFAULT_PAGE_SIZE,
            max_new_memos: DEFAULT_MAX_NEW_MEMOS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            fetch_delay: Duration::from_millis(DEFAULT_FETCH_DELAY_MS),
            rate_limit_backoff: Duration::from_millis(DEFAULT_RATE_LIMIT_BACKOFF_MS),
        }
    }
}

impl SyncConfig {
    /// Load from environment or use defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("MEMO_SYNC_PDA_ADDRESS") {
            if !addr.trim().is_empty() {
                config.pda_address = addr.trim().to_string();
            }
        }
        if let Ok(list) = std::env::var("MEMO_SYNC_RPC_ENDPOINTS") {
            let endpoints = parse_endpoint_list(&list);
            if !endpoints.is_empty() {
                config.rpc_endpoints = endpoints;
            }
        }
        if let Some(n) = env_parse::<usize>("MEMO_SYNC_PAGE_SIZE").filter(|n| *n > 0) {
            config.page_size = n;
        }
        if let Some(n) = env_parse::<usize>("MEMO_SYNC_MAX_NEW_MEMOS").filter(|n| *n > 0) {
            config.max_new_memos = n;
        }
        if let Some(secs) = env_parse::<u64>("MEMO_SYNC_REQUEST_TIMEOUT").filter(|n| *n > 0) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env_parse::<u64>("MEMO_SYNC_FETCH_DELAY_MS") {
            config.fetch_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("MEMO_SYNC_RATE_LIMIT_BACKOFF_MS") {
            config.rate_limit_backoff = Duration::from_millis(ms);
        }

        config
    }

    /// Whether instructions of `program_id` carry memo payloads
    pub fn is_memo_program(&self, program_id: &str) -> bool {
        self.memo_programs.iter().any(|p| p == program_id)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Split a comma-separated endpoint list, dropping blanks and duplicates
pub fn parse_endpoint_list(list: &str) -> Vec<String> {
    let mut endpoints: Vec<String> = Vec::new();
    for raw in list.split(',') {
        let endpoint = raw.trim();
        if !endpoint.is_empty() && !endpoints.iter().any(|e| e == endpoint) {
            endpoints.push(endpoint.to_string());
        }
    }
    endpoints
}

/// Store path used when no override is given.
///
/// Resolves to `memos.json` next to the directory holding the executable,
/// so a binary installed under `<root>/bin/` writes to `<root>/memos.json`.
pub fn default_store_path() -> PathBuf {
    if let Ok(path) = std::env::var("MEMO_SYNC_OUTPUT") {
        if !path.trim().is_empty() {
            return PathBuf::from(path.trim());
        }
    }

    std::env::current_exe()
        .ok()
        .and_then(|exe| deployment_root(&exe))
        .map(|root| root.join(DEFAULT_STORE_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE))
}

fn deployment_root(exe: &std::path::Path) -> Option<PathBuf> {
    exe.parent()?.parent().map(|p| p.to_path_buf())
}
