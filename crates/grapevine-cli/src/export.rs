//! CSV/JSON export of run results.
//!
//! All writers take the run's path prefix and derive their own file
//! name from it, creating parent directories as needed. Keys are
//! exported in their external representation: groups ordered by
//! descending size, then ascending content.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use grapevine_engine::BfsResult;
use grapevine_model::Protocol;

/// Run parameters recorded into the metadata export.
pub struct RunMeta {
    pub protocol: Protocol,
    pub n: usize,
    pub max_depth: usize,
    pub workers: usize,
    pub batch_size: usize,
    pub serial: bool,
}

/// `<prefix>_per_level.csv`: one `depth,count` row per level.
pub fn write_per_level_csv(prefix: &Path, per_level: &[usize]) -> io::Result<PathBuf> {
    let path = suffixed(prefix, "_per_level.csv");
    ensure_parent(&path)?;
    let mut out = String::from("depth,count\n");
    for (depth, count) in per_level.iter().enumerate() {
        out.push_str(&format!("{depth},{count}\n"));
    }
    fs::write(&path, out)?;
    Ok(path)
}

/// `<prefix>_layers.csv`: every canonical key, one `depth,key` row,
/// with the key serialized as a JSON string.
pub fn write_layers_csv(prefix: &Path, res: &BfsResult) -> io::Result<PathBuf> {
    let path = suffixed(prefix, "_layers.csv");
    ensure_parent(&path)?;
    let mut out = String::from("depth,key\n");
    for (depth, keys) in &res.layers {
        for key in keys {
            let json = serde_json::to_string(&key.display_groups()).map_err(io::Error::other)?;
            // The JSON holds only digits, brackets and commas; plain
            // CSV quoting is enough.
            out.push_str(&format!("{depth},\"{json}\"\n"));
        }
    }
    fs::write(&path, out)?;
    Ok(path)
}

/// `<prefix>_meta.json`: run parameters plus result summary.
pub fn write_meta_json(
    prefix: &Path,
    meta: &RunMeta,
    res: &BfsResult,
    per_level: &[usize],
) -> io::Result<PathBuf> {
    let path = suffixed(prefix, "_meta.json");
    ensure_parent(&path)?;
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let doc = json!({
        "timestamp_unix": timestamp,
        "params": {
            "protocol": meta.protocol.to_string(),
            "n": meta.n,
            "max_depth": meta.max_depth,
            "workers": meta.workers,
            "batch_size": meta.batch_size,
            "mode": if meta.serial { "serial" } else { "parallel" },
        },
        "summary": {
            "reachable_count": res.reachable_count,
            "transitions": res.transitions,
            "depths": per_level.len(),
            "per_level": per_level,
        },
    });
    let body = serde_json::to_string_pretty(&doc).map_err(io::Error::other)?;
    fs::write(&path, body)?;
    Ok(path)
}

fn suffixed(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    prefix.with_file_name(name)
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
