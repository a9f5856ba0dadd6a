//! Document files for the JSON store
//!
//! Every document of a mutation is first written and synced to a
//! `<name>.json.tmp` file beside its target. Targets are only replaced once
//! all of them are staged, so a failed write leaves the old documents alone.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{ExpenseError, ExpenseResult};

/// Load a document, `None` when the file does not exist
pub fn load_document<T: DeserializeOwned>(path: &Path) -> ExpenseResult<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ExpenseError::Storage(format!(
                "Failed to open {}: {}",
                path.display(),
                e
            )))
        }
    };

    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|e| ExpenseError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write a single document through a one-entry batch
pub fn write_document<T: Serialize>(path: &Path, data: &T) -> ExpenseResult<()> {
    let mut batch = DocumentBatch::default();
    batch.stage(path, data)?;
    batch.commit()
}

#[derive(Debug)]
struct Staged {
    temp: PathBuf,
    target: PathBuf,
}

/// Documents replaced together
///
/// Staged files that are never committed are removed on drop.
#[derive(Debug, Default)]
pub struct DocumentBatch {
    staged: Vec<Staged>,
}

impl DocumentBatch {
    /// Serialize `data` next to `target` without touching `target`
    pub fn stage<T: Serialize>(&mut self, target: &Path, data: &T) -> ExpenseResult<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ExpenseError::Storage(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp = target.with_extension("json.tmp");
        if let Err(e) = write_synced(&temp, data) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        self.staged.push(Staged {
            temp,
            target: target.to_path_buf(),
        });
        Ok(())
    }

    /// Move every staged document into place, in staging order
    pub fn commit(mut self) -> ExpenseResult<()> {
        while !self.staged.is_empty() {
            let doc = self.staged.remove(0);
            fs::rename(&doc.temp, &doc.target).map_err(|e| {
                let _ = fs::remove_file(&doc.temp);
                ExpenseError::Storage(format!(
                    "Failed to replace {}: {}",
                    doc.target.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

impl Drop for DocumentBatch {
    fn drop(&mut self) {
        for doc in &self.staged {
            let _ = fs::remove_file(&doc.temp);
        }
    }
}

fn write_synced<T: Serialize>(path: &Path, data: &T) -> ExpenseResult<()> {
    let file = File::create(path)
        .map_err(|e| ExpenseError::Storage(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| ExpenseError::Storage(format!("Failed to serialize data: {}", e)))?;
    writer
        .flush()
        .map_err(|e| ExpenseError::Storage(format!("Failed to flush data: {}", e)))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| ExpenseError::Storage(format!("Failed to sync data: {}", e)))
}
