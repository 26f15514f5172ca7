//! Sync runs.
//!
//! A run loads the store, scans for unseen memos, merges, and writes the
//! store back atomically. `run_worker` repeats runs on a fixed interval.

use crate::config::SyncConfig;
use crate::history::{self, ScanMode};
use crate::rpc::{HttpTransport, LedgerClient, RpcTransport};
use crate::store;
use memo_sync_types::FetchStats;
use std::path::Path;
use std::time::{Duration, Instant};

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub new_memos: usize,
    pub total_memos: usize,
    pub rpc_requests: u64,
}

/// One full sync against `output`.
///
/// Only a failure to write the store is an error; network trouble just
/// means fewer (or no) new memos this time.
pub async fn run_sync<T: RpcTransport>(
    client: &mut LedgerClient<T>,
    config: &SyncConfig,
    output: &Path,
    mode: ScanMode,
) -> Result<RunReport, String> {
    let started = Instant::now();
    log::info!("[MEMO_SYNC] Memo sync starting ({:?})", mode);

    let existing = store::load_store(output);
    let outcome =
        history::scan_new_memos(client, config, &existing.known_signatures, mode).await;
    log::debug!(
        "[MEMO_SYNC] Scan stopped after {} page(s): {:?}",
        outcome.pages,
        outcome.stop_reason
    );

    let new_memos = outcome.memos.len();
    let merged = store::merge_memos(existing.memos, outcome.memos);
    let total_memos = merged.len();

    let stats = FetchStats {
        run_time: format_run_time(started.elapsed()),
        new_memos_found: new_memos,
        total_after_merge: total_memos,
        rpc_requests: client.request_count(),
    };
    let snapshot = store::build_store(&config.pda_address, merged, stats);
    store::save_store_atomic(output, &snapshot)?;

    log::info!(
        "[MEMO_SYNC] Complete: +{} new, {} total",
        new_memos,
        total_memos
    );
    log::info!("[MEMO_SYNC] Saved to: {}", output.display());
    log::debug!(
        "[RPC] {} requests, last good endpoint: {}",
        client.request_count(),
        client.active_endpoint().unwrap_or("none")
    );

    Ok(RunReport {
        new_memos,
        total_memos,
        rpc_requests: client.request_count(),
    })
}

/// Run once against the configured HTTP endpoints
pub async fn run_once(
    config: &SyncConfig,
    output: &Path,
    mode: ScanMode,
) -> Result<RunReport, String> {
    let transport = HttpTransport::new(config.request_timeout)?;
    let mut client = LedgerClient::new(transport, config);
    run_sync(&mut client, config, output, mode).await
}

/// Repeat runs forever, `poll_interval_secs` apart; failed runs are logged and retried
pub async fn run_worker(
    config: SyncConfig,
    output: &Path,
    mode: ScanMode,
    poll_interval_secs: u64,
) {
    log::info!(
        "[MEMO_SYNC] Worker started (poll interval: {}s)",
        poll_interval_secs
    );

    let transport = match HttpTransport::new(config.request_timeout) {
        Ok(t) => t,
        Err(e) => {
            log::error!("[MEMO_SYNC] {}", e);
            return;
        }
    };

    loop {
        let mut client = LedgerClient::new(transport.clone(), &config);
        if let Err(e) = run_sync(&mut client, &config, output, mode).await {
            log::error!("[MEMO_SYNC] Run failed: {}", e);
        }

        tokio::time::sleep(Duration::from_secs(poll_interval_secs)).await;
    }
}

/// `H:MM:SS[.ffffff]`, matching the store files already in circulation
pub fn format_run_time(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let micros = elapsed.subsec_micros();

    if micros == 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}:{:02}.{:06}", hours, minutes, seconds, micros)
    }
}
