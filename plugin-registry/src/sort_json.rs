//! Sorts a JSON file, or verifies that it is already sorted.
//!
//! Lists sort by value (strings directly, anything else by its serialized
//! form); objects sort by top-level key. Sorted files are rewritten with
//! 2-space indentation and a trailing newline.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{error, info, warn};

/// Check or sort one JSON file in place.
///
/// Returns `false` when the file is unsorted in check mode, or when it cannot
/// be processed at all; failures are logged, never raised, so callers can
/// sweep a whole file set and report at the end.
pub fn sort_json(path: &Path, check_only: bool) -> bool {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            error!(file = %path.display(), error = %e, "Could not read file");
            return false;
        }
    };
    let data: Value = match serde_json::from_str(&raw) {
        Ok(data) => data,
        Err(e) => {
            error!(file = %path.display(), error = %e, "Invalid JSON");
            return false;
        }
    };

    let sorted = match sorted_value(&data) {
        Some(sorted) => sorted,
        None => {
            warn!(file = %path.display(), "Only lists and objects are supported");
            return false;
        }
    };

    // Key order is invisible to `Value` equality; compare serialized forms.
    let changed = serde_json::to_string(&data).ok() != serde_json::to_string(&sorted).ok();

    if check_only {
        if changed {
            error!(file = %path.display(), "File is not sorted");
            return false;
        }
        info!(file = %path.display(), "File is already sorted");
        return true;
    }

    if changed {
        let mut text = match serde_json::to_string_pretty(&sorted) {
            Ok(text) => text,
            Err(e) => {
                error!(file = %path.display(), error = %e, "Could not serialize sorted data");
                return false;
            }
        };
        text.push('\n');
        if let Err(e) = fs::write(path, text) {
            error!(file = %path.display(), error = %e, "Could not write sorted file");
            return false;
        }
        info!(file = %path.display(), "File has been sorted");
    } else {
        info!(file = %path.display(), "File was already sorted, no changes made");
    }
    true
}

/// The sorted rendition of `data`, or `None` for scalars.
fn sorted_value(data: &Value) -> Option<Value> {
    match data {
        Value::Array(items) => {
            let mut items = items.clone();
            items.sort_by_key(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            Some(Value::Array(items))
        }
        Value::Object(map) => {
            let mut pairs: Vec<(String, Value)> =
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            Some(Value::Object(pairs.into_iter().collect()))
        }
        _ => None,
    }
}
