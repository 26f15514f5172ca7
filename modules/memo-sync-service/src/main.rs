//! Memo Sync — pulls memos inscribed on the GEOINT PDA into a local JSON store.
//!
//! Safe to run from cron: existing memos are never dropped, the store is
//! replaced atomically, and incremental runs stop at the first known signature.
//!
//!     memo-sync                      # incremental update
//!     memo-sync --full               # full rescan, still preserves existing
//!     memo-sync --output /path/to/memos.json
//!     memo-sync --poll-interval 300  # keep running, one sync every 5 minutes

mod config;
mod extract;
mod history;
mod rpc;
mod store;
#[cfg(test)]
mod testutil;
mod worker;

use clap::Parser;
use config::SyncConfig;
use history::ScanMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "memo-sync", about = "Fetch GEOINT memos (cron-safe)")]
struct Cli {
    /// Output JSON file (default: memos.json in the deployment root)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Full rescan; existing memos are still preserved
    #[arg(long)]
    full: bool,
    /// Keep running and sync every N seconds instead of exiting after one run
    #[arg(long, env = "MEMO_SYNC_POLL_INTERVAL")]
    poll_interval: Option<u64>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env();
    let output = cli.output.unwrap_or_else(config::default_store_path);
    let mode = if cli.full {
        ScanMode::FullRescan
    } else {
        ScanMode::Incremental
    };

    log::info!(
        "[MEMO_SYNC] PDA {} via {} endpoint(s), store at {}",
        config.pda_address,
        config.rpc_endpoints.len(),
        output.display()
    );

    match cli.poll_interval.filter(|secs| *secs > 0) {
        Some(secs) => worker::run_worker(config, &output, mode, secs).await,
        None => {
            match worker::run_once(&config, &output, mode).await {
                Ok(report) => log::debug!(
                    "[MEMO_SYNC] Run used {} RPC requests ({} new of {} total)",
                    report.rpc_requests,
                    report.new_memos,
                    report.total_memos
                ),
                Err(e) => {
                    log::error!("[MEMO_SYNC] Sync failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
