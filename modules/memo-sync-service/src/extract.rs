//! Memo extraction from `jsonParsed` transactions.

use crate::config::SyncConfig;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::DateTime;
use memo_sync_types::{Memo, SPL_MEMO_PROGRAM_TAG, UNKNOWN_AUTHOR};
use serde_json::Value;

/// Why a transaction could not be inspected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    NotAnObject,
    /// A field that must be an array had another type
    BadField(&'static str),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::NotAnObject => write!(f, "transaction is not a JSON object"),
            ExtractError::BadField(name) => write!(f, "field '{}' has an unexpected type", name),
        }
    }
}

/// Extract the memo carried by `tx`, treating malformed input as "no memo".
pub fn extract_memo(tx: &Value, signature: &str, config: &SyncConfig) -> Option<Memo> {
    match try_extract(tx, signature, config) {
        Ok(memo) => memo,
        Err(e) => {
            log::debug!("[MEMO_SYNC] Could not parse tx {}: {}", signature, e);
            None
        }
    }
}

/// Extract the memo carried by `tx`.
///
/// `Ok(None)` means the transaction is well formed but has no usable memo.
pub fn try_extract(
    tx: &Value,
    signature: &str,
    config: &SyncConfig,
) -> Result<Option<Memo>, ExtractError> {
    if !tx.is_object() {
        return Err(ExtractError::NotAnObject);
    }

    let message = tx.get("transaction").and_then(|t| t.get("message"));
    let instructions = collect_instructions(tx, message)?;

    let content = match find_memo_text(&instructions, config) {
        Some(text) if !text.is_empty() => text,
        _ => return Ok(None),
    };

    let account_keys = array_field(message.and_then(|m| m.get("accountKeys")), "accountKeys")?;
    let author = resolve_author(account_keys);

    let block_time = tx
        .get("blockTime")
        .and_then(|v| v.as_i64())
        .filter(|secs| *secs != 0);

    Ok(Some(Memo {
        signature: signature.to_string(),
        author,
        content,
        timestamp: block_time.and_then(|secs| secs.checked_mul(1000)),
        datetime: block_time.and_then(format_block_time),
    }))
}

/// Top-level instructions followed by every inner-instruction group, in order
fn collect_instructions<'a>(
    tx: &'a Value,
    message: Option<&'a Value>,
) -> Result<Vec<&'a Value>, ExtractError> {
    let top_level = array_field(message.and_then(|m| m.get("instructions")), "instructions")?;
    let mut all: Vec<&Value> = top_level.iter().collect();

    let groups = array_field(
        tx.get("meta").and_then(|m| m.get("innerInstructions")),
        "innerInstructions",
    )?;
    for group in groups {
        all.extend(array_field(group.get("instructions"), "innerInstructions.instructions")?);
    }

    Ok(all)
}

/// Missing and null fields read as empty arrays
fn array_field<'a>(
    value: Option<&'a Value>,
    name: &'static str,
) -> Result<&'a [Value], ExtractError> {
    match value {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(ExtractError::BadField(name)),
    }
}

fn find_memo_text(instructions: &[&Value], config: &SyncConfig) -> Option<String> {
    for ix in instructions {
        let program_id = ix.get("programId").and_then(|v| v.as_str()).unwrap_or("");
        let is_tagged = ix.get("program").and_then(|v| v.as_str()) == Some(SPL_MEMO_PROGRAM_TAG);

        if !is_tagged && !config.is_memo_program(program_id) {
            continue;
        }

        // Parsed text ends the scan even when it turns out to be blank
        if is_tagged {
            if let Some(parsed) = ix.get("parsed").and_then(|v| v.as_str()) {
                return Some(clean_memo_text(parsed));
            }
        }

        if let Some(data) = ix.get("data").and_then(|v| v.as_str()) {
            if let Some(text) = decode_memo_data(data) {
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

/// Decode base64 memo data into trimmed text without NUL bytes
pub fn decode_memo_data(data: &str) -> Option<String> {
    let bytes = BASE64.decode(data.trim()).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    Some(clean_memo_text(&text))
}

fn clean_memo_text(text: &str) -> String {
    text.replace('\0', "").trim().to_string()
}

/// Signer key first, then the first key of any shape
fn resolve_author(account_keys: &[Value]) -> String {
    let signer = account_keys
        .iter()
        .find(|k| k.get("signer").and_then(|s| s.as_bool()) == Some(true))
        .and_then(|k| k.get("pubkey"))
        .and_then(|p| p.as_str());

    let first = || {
        account_keys.first().and_then(|k| {
            k.as_str()
                .or_else(|| k.get("pubkey").and_then(|p| p.as_str()))
        })
    };

    signer
        .or_else(first)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_AUTHOR)
        .to_string()
}

fn format_block_time(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}
