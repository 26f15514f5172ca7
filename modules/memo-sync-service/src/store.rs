//! Memo store file: loading, merging, and atomic replacement.

use memo_sync_types::{FetchStats, Memo, MemoStore};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Memos read at startup plus their signatures for quick lookups
#[derive(Debug, Default)]
pub struct LoadedStore {
    pub memos: Vec<Memo>,
    pub known_signatures: HashSet<String>,
}

/// Load existing memos from `path`.
///
/// A missing file is an empty store. An unreadable or unparseable file is
/// also treated as empty for this run, but is left on disk untouched.
pub fn load_store(path: &Path) -> LoadedStore {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadedStore::default(),
        Err(e) => {
            log::warn!(
                "[MEMO_SYNC] Could not read existing file {}: {}",
                path.display(),
                e
            );
            return LoadedStore::default();
        }
    };

    match serde_json::from_str::<MemoStore>(&raw) {
        Ok(store) => {
            let known_signatures = store.memos.iter().map(|m| m.signature.clone()).collect();
            log::info!("[MEMO_SYNC] Loaded {} existing memos", store.memos.len());
            LoadedStore {
                memos: store.memos,
                known_signatures,
            }
        }
        Err(e) => {
            log::warn!(
                "[MEMO_SYNC] Could not parse existing file {}: {}",
                path.display(),
                e
            );
            LoadedStore::default()
        }
    }
}

/// Combine stored and freshly extracted memos.
///
/// Signatures stay unique; a fresh memo replaces a stored one with the same
/// signature. Output is newest first, memos without a timestamp last.
pub fn merge_memos(existing: Vec<Memo>, fresh: Vec<Memo>) -> Vec<Memo> {
    let mut by_signature: HashMap<String, Memo> =
        HashMap::with_capacity(existing.len() + fresh.len());
    for memo in existing.into_iter().chain(fresh) {
        by_signature.insert(memo.signature.clone(), memo);
    }

    let mut merged: Vec<Memo> = by_signature.into_values().collect();
    merged.sort_by(|a, b| {
        b.sort_timestamp()
            .cmp(&a.sort_timestamp())
            .then_with(|| a.signature.cmp(&b.signature))
    });
    merged
}

pub fn build_store(pda_address: &str, memos: Vec<Memo>, stats: FetchStats) -> MemoStore {
    MemoStore {
        pda_address: pda_address.to_string(),
        last_updated: chrono::Utc::now().to_rfc3339(),
        total_memos: memos.len(),
        last_fetch_stats: stats,
        memos,
    }
}

/// Sibling path the store is staged at before the rename
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `store` to `path` without ever exposing a partial file there.
///
/// The JSON goes to `<path>.tmp`, is synced to disk, and is then renamed
/// over `path`. Any failure leaves `path` as it was.
pub fn save_store_atomic(path: &Path, store: &MemoStore) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create directory {}: {}", parent.display(), e))?;
    }

    let tmp = temp_path(path);
    if let Err(e) = write_synced(&tmp, store) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        format!("Failed to replace {}: {}", path.display(), e)
    })
}

fn write_synced(tmp: &Path, store: &MemoStore) -> Result<(), String> {
    let file = File::create(tmp)
        .map_err(|e| format!("Failed to create {}: {}", tmp.display(), e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, store)
        .map_err(|e| format!("Failed to serialize store: {}", e))?;
    writer
        .flush()
        .map_err(|e| format!("Failed to write {}: {}", tmp.display(), e))?;
    let file = writer
        .into_inner()
        .map_err(|e| format!("Failed to write {}: {}", tmp.display(), e.error()))?;
    file.sync_all()
        .map_err(|e| format!("Failed to sync {}: {}", tmp.display(), e))
}
