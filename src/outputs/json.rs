//! JSON file persistence.
//!
//! Everything the pipeline writes is pretty-printed JSON named after the
//! sitting date in compact form (`20250819.json`): raw extraction arrays in
//! the raw directory, processed articles (or their raw fallback) in the output
//! directory.

use crate::models::RawTranscriptFile;
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Serialize `value` to `{dir}/{filename}`, creating `dir` if needed.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(%dir, %filename))]
pub async fn write_json<T>(dir: &str, filename: &str, value: &T) -> Result<PathBuf, Box<dyn Error>>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string_pretty(value)?;

    if let Err(e) = fs::create_dir_all(dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = Path::new(dir).join(filename);
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON file");
    Ok(path)
}

/// Read a raw extraction file: a single page or an array of pages.
pub async fn read_raw(path: &Path) -> Result<RawTranscriptFile, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| format!("reading {}: {e}", path.display()))?;
    let raw = serde_json::from_str(&text).map_err(|e| format!("parsing {}: {e}", path.display()))?;
    Ok(raw)
}

/// `*.json` file names in `dir`, excluding `index.json`, sorted ascending.
///
/// A missing directory yields an empty list.
pub async fn list_json_files(dir: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".json") && name != "index.json" {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
