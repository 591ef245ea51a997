//! `index.json` maintenance.
//!
//! The frontend discovers published days through `index.json`: a JSON array
//! of article file names, newest first. It is rebuilt from the directory
//! listing after every batch rather than appended to, so deleting a file and
//! re-running `index` is enough to unpublish a day.

use crate::outputs::json::list_json_files;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

pub const INDEX_FILE: &str = "index.json";

/// Rebuild `{output_dir}/index.json` and return the file names it lists.
///
/// A missing output directory is logged and yields an empty list without
/// writing anything.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn update_news_index(output_dir: &str) -> Result<Vec<String>, Box<dyn Error>> {
    if !Path::new(output_dir).is_dir() {
        warn!("Output directory does not exist; index not written");
        return Ok(Vec::new());
    }

    let mut files = list_json_files(output_dir).await?;
    files.reverse();

    let path = Path::new(output_dir).join(INDEX_FILE);
    fs::write(&path, serde_json::to_string_pretty(&files)?).await?;
    info!(count = files.len(), path = %path.display(), "Updated news index");
    Ok(files)
}

/// Read `{output_dir}/index.json`; a missing file is an empty index.
pub async fn read_news_index(output_dir: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let path = Path::new(output_dir).join(INDEX_FILE);
    match fs::read_to_string(&path).await {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "No news index found");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!("paperboy_index_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_index_sorted_descending_without_itself() {
        let dir = temp_dir("sorted");
        std::fs::create_dir_all(format!("{dir}/raw")).unwrap();
        for name in ["20250819.json", "20250821.json", "20250820.json", "readme.md"] {
            std::fs::write(format!("{dir}/{name}"), "{}").unwrap();
        }
        std::fs::write(format!("{dir}/raw/20250822.json"), "[]").unwrap();

        let files = update_news_index(&dir).await.unwrap();
        assert_eq!(files, vec!["20250821.json", "20250820.json", "20250819.json"]);

        // Rebuilding must not pick up the index it just wrote.
        let again = update_news_index(&dir).await.unwrap();
        assert_eq!(again, files);
        assert_eq!(read_news_index(&dir).await.unwrap(), files);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_dir_yields_empty_index() {
        let dir = temp_dir("missing");
        assert!(update_news_index(&dir).await.unwrap().is_empty());
        assert!(!Path::new(&dir).exists());
        assert!(read_news_index(&dir).await.unwrap().is_empty());
    }
}
