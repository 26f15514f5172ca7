//! Backward walk over the PDA's transaction history.
//!
//! Pages go newest to oldest using the previous page's last signature as the
//! `before` cursor. Each unseen signature costs one `getTransaction` call.

use crate::config::SyncConfig;
use crate::extract;
use crate::rpc::{LedgerClient, RpcTransport};
use memo_sync_types::Memo;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Stop at the first already-stored signature
    Incremental,
    /// Skip stored signatures and keep walking back
    FullRescan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Empty (or unavailable) page
    EndOfHistory,
    HitKnown,
    CapReached,
    /// Page shorter than requested, so nothing older exists
    ShortPage,
}

#[derive(Debug)]
pub struct ScanOutcome {
    /// New memos, newest first
    pub memos: Vec<Memo>,
    pub pages: usize,
    pub stop_reason: StopReason,
}

/// Collect memos whose signatures are not in `known`.
pub async fn scan_new_memos<T: RpcTransport>(
    client: &mut LedgerClient<T>,
    config: &SyncConfig,
    known: &HashSet<String>,
    mode: ScanMode,
) -> ScanOutcome {
    let mut memos: Vec<Memo> = Vec::new();
    let mut before: Option<String> = None;
    let mut pages = 0usize;

    let finish = |memos, pages, stop_reason| ScanOutcome {
        memos,
        pages,
        stop_reason,
    };

    loop {
        if memos.len() >= config.max_new_memos {
            return finish(memos, pages, StopReason::CapReached);
        }
        pages += 1;

        let page = match client
            .get_signatures_for_address(&config.pda_address, config.page_size, before.as_deref())
            .await
        {
            Some(page) if !page.is_empty() => page,
            _ => {
                log::info!("[MEMO_SYNC] End of history");
                return finish(memos, pages, StopReason::EndOfHistory);
            }
        };

        for entry in &page {
            if entry.is_failed() {
                continue;
            }

            if known.contains(&entry.signature) {
                match mode {
                    ScanMode::Incremental => {
                        log::info!("[MEMO_SYNC] Hit known signature, stopping");
                        return finish(memos, pages, StopReason::HitKnown);
                    }
                    ScanMode::FullRescan => continue,
                }
            }

            if !config.fetch_delay.is_zero() {
                tokio::time::sleep(config.fetch_delay).await;
            }

            let Some(tx) = client.get_transaction(&entry.signature).await else {
                continue;
            };
            let Some(memo) = extract::extract_memo(&tx, &entry.signature, config) else {
                continue;
            };

            log::info!(
                "[MEMO_SYNC] + New memo: {}...",
                memo.author.chars().take(8).collect::<String>()
            );
            memos.push(memo);

            if memos.len() >= config.max_new_memos {
                return finish(memos, pages, StopReason::CapReached);
            }
        }

        let cursor = page.last().map(|e| e.signature.clone());
        if page.len() < config.page_size {
            return finish(memos, pages, StopReason::ShortPage);
        }
        if cursor.is_none() || cursor == before {
            log::warn!("[MEMO_SYNC] Cursor did not advance, treating as end of history");
            return finish(memos, pages, StopReason::EndOfHistory);
        }
        before = cursor;
    }
}
