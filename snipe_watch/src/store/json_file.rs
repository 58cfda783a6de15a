//! File-backed store: one `<document>.json` file per document in a data directory

use super::{Document, StateStore};
use crate::error::StoreResult;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each document as a JSON file
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store in `data_dir`, creating the directory if needed
    pub fn new(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        log::info!("JSON state directory: {}", data_dir.display());
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
        })
    }

    fn path(&self, document: Document) -> PathBuf {
        self.data_dir.join(format!("{}.json", document.key()))
    }
}

impl StateStore for JsonFileStore {
    fn read(&self, document: Document) -> StoreResult<Option<String>> {
        match std::fs::read_to_string(self.path(document)) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, document: Document, json: &str) -> StoreResult<()> {
        let path = self.path(document);
        // Write to a sibling temp file, then rename over the document
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}
