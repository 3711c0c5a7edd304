use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::BackupError;
use crate::prompt::Prompt;

pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("prompt-backup-{}.json", at.format("%Y-%m-%d"))
}

/// Pretty-printed JSON array, two-space indent, fields in record order.
pub fn to_json(prompts: &[Prompt]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(prompts)
}

/// Accepts the export format. A `null` document is an empty backup.
pub fn parse_backup(raw: &str) -> serde_json::Result<Vec<Prompt>> {
    let prompts: Option<Vec<Prompt>> = serde_json::from_str(raw)?;
    Ok(prompts.unwrap_or_default())
}

/// Writes the whole collection into `dir` and returns the file's path.
pub async fn export(
    prompts: &[Prompt],
    dir: &Path,
    at: DateTime<Utc>,
) -> Result<PathBuf, BackupError> {
    let path = dir.join(backup_file_name(at));
    let json = to_json(prompts).map_err(|source| BackupError::Format {
        path: path.clone(),
        source,
    })?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| BackupError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|source| BackupError::Io {
            path: path.clone(),
            source,
        })?;

    tracing::info!(count = prompts.len(), path = %path.display(), "Exported prompts");
    Ok(path)
}

pub async fn read_backup(path: &Path) -> Result<Vec<Prompt>, BackupError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BackupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_backup(&raw).map_err(|source| BackupError::Format {
        path: path.to_path_buf(),
        source,
    })
}
