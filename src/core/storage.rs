use crate::core::merge::FinalReport;
use crate::error::{Error, Result};
use serde_json::Value;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info};

pub const COMMENTS_FILE: &str = "comments.json";
pub const RAW_RESULTS_FILE: &str = "raw_results.json";
pub const FINAL_RESULTS_FILE: &str = "final_results.json";

const EMPTY_ARRAY: &str = "[]\n";
const INDENT: &str = "    ";

pub async fn save_comments(path: &Path, comments: &[String]) -> Result<()> {
    write_atomic(path, &serde_json::to_vec_pretty(comments)?).await?;
    info!(path = %path.display(), count = comments.len(), "Comments saved");
    Ok(())
}

/// Load the persisted comment list. Any failure here is a `SourceUnavailable`.
pub async fn load_comments(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| Error::source_unavailable(path.display(), e))?;

    serde_json::from_str(&content).map_err(|e| Error::source_unavailable(path.display(), e))
}

/// Overwrite the final report. Written to a sibling temp file first so a
/// crash never leaves a truncated report behind.
pub async fn write_report(path: &Path, report: &FinalReport) -> Result<()> {
    write_atomic(path, &serde_json::to_vec_pretty(report)?).await?;
    info!(path = %path.display(), insights = report.total_insights(), "Final report written");
    Ok(())
}

pub async fn load_report(path: &Path) -> Result<FinalReport> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Durable, append-only list of parsed chunk results backed by a JSON array
/// file.
///
/// Appends only rewrite the tail of the file (from the closing bracket on),
/// so the cost of each append does not grow with the number of stored
/// results. The file is a valid JSON array after every call.
#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    file: File,
    len: usize,
    // byte offset of the closing `]`
    close_offset: u64,
}

impl ResultStore {
    /// Create or truncate the store to an empty array.
    pub async fn reset(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_parent_dir(&path).await?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await?;
        file.write_all(EMPTY_ARRAY.as_bytes()).await?;
        file.sync_data().await?;

        info!(path = %path.display(), "Result store initialised");

        Ok(Self {
            path,
            file,
            len: 0,
            close_offset: 1,
        })
    }

    /// Attach to a store left behind by an earlier run without truncating it.
    #[allow(dead_code)]
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = fs::read_to_string(&path).await?;
        let entries: Vec<Value> = serde_json::from_str(&content)?;
        let close_offset = content
            .rfind(']')
            .ok_or_else(|| Error::custom(format!("{} is not a JSON array", path.display())))?
            as u64;

        let file = OpenOptions::new().read(true).write(true).open(&path).await?;

        Ok(Self {
            path,
            file,
            len: entries.len(),
            close_offset,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Append one result and flush it to disk before returning.
    pub async fn append(&mut self, entry: &Value) -> Result<()> {
        let body = serde_json::to_string_pretty(entry)?;
        let separator = if self.len == 0 { "\n" } else { ",\n" };

        let mut chunk = String::with_capacity(body.len() + 16);
        chunk.push_str(separator);
        chunk.push_str(INDENT);
        chunk.push_str(&body.replace('\n', &format!("\n{INDENT}")));
        chunk.push('\n');
        let new_close = self.close_offset + chunk.len() as u64;
        chunk.push_str("]\n");

        self.file.seek(SeekFrom::Start(self.close_offset)).await?;
        self.file.write_all(chunk.as_bytes()).await?;
        self.file.flush().await?;
        self.file.set_len(new_close + 2).await?;
        self.file.sync_data().await?;

        self.close_offset = new_close;
        self.len += 1;
        debug!(path = %self.path.display(), stored = self.len, "Result appended");
        Ok(())
    }

    pub async fn read_all(&self) -> Result<Vec<Value>> {
        read_results(&self.path).await
    }
}

pub async fn read_results(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent_dir(path).await?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_data().await?;
    drop(file);

    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::merge::merge_results;
    use serde_json::json;

    #[tokio::test]
    async fn reset_creates_an_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw_results.json");
        fs::write(&path, "[{\"stale\": true}]").await.unwrap();

        let store = ResultStore::reset(&path).await.unwrap();

        assert_eq!(store.len(), 0);
        assert_eq!(store.read_all().await.unwrap(), Vec::<Value>::new());
    }

    #[tokio::test]
    async fn appends_are_visible_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("raw_results.json");
        let mut store = ResultStore::reset(&path).await.unwrap();

        let first = json!({"Praise": [{"comment": "c1", "insight": "i1"}]});
        let second = json!({"Requests": [{"comment": "c2", "insight": "multi\nline ]"}]});
        store.append(&first).await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), vec![first.clone()]);

        store.append(&second).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.read_all().await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn reopened_store_keeps_appending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw_results.json");

        let mut store = ResultStore::reset(&path).await.unwrap();
        store.append(&json!({"Other": []})).await.unwrap();
        drop(store);

        let mut store = ResultStore::open(&path).await.unwrap();
        assert_eq!(store.len(), 1);
        store.append(&json!({"Praise": []})).await.unwrap();

        assert_eq!(
            read_results(&path).await.unwrap(),
            vec![json!({"Other": []}), json!({"Praise": []})]
        );
    }

    #[tokio::test]
    async fn opens_arrays_written_by_other_tools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw_results.json");
        fs::write(&path, "[\n    {\n        \"Praise\": []\n    }\n]").await.unwrap();

        let mut store = ResultStore::open(&path).await.unwrap();
        store.append(&json!({"Complaints": []})).await.unwrap();

        assert_eq!(
            store.read_all().await.unwrap(),
            vec![json!({"Praise": []}), json!({"Complaints": []})]
        );
    }

    #[tokio::test]
    async fn missing_comments_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_comments(&dir.path().join("comments.json")).await.unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn invalid_comments_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comments.json");
        fs::write(&path, "null").await.unwrap();
        assert!(matches!(
            load_comments(&path).await.unwrap_err(),
            Error::SourceUnavailable { .. }
        ));
    }

    #[tokio::test]
    async fn comments_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comments.json");
        let comments = vec!["one".to_string(), "two".to_string()];

        save_comments(&path, &comments).await.unwrap();

        assert_eq!(load_comments(&path).await.unwrap(), comments);
    }

    #[tokio::test]
    async fn report_is_overwritten_not_accumulated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final_results.json");
        let store = vec![json!({"Praise": [{"comment": "c", "insight": "i"}]})];

        write_report(&path, &merge_results(&store)).await.unwrap();
        let first = fs::read_to_string(&path).await.unwrap();
        write_report(&path, &merge_results(&store)).await.unwrap();
        let second = fs::read_to_string(&path).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(load_report(&path).await.unwrap().praise.len(), 1);
        assert!(!dir.path().join("final_results.json.tmp").exists());
    }
}
