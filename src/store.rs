use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::overlay::ManualReport;
use crate::report::Report;

/// Report shapes that can be written to disk.
pub trait StoredReport: Serialize + DeserializeOwned + Send + Sync {}

impl StoredReport for Report {}
impl StoredReport for ManualReport {}

/// A single JSON file holding the latest saved report of type `R`.
///
/// Every save replaces the whole file.
#[derive(Debug, Clone)]
pub struct ReportStore<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R: StoredReport> ReportStore<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, report: &R) -> Result<(), StoreError> {
        let mut json = serde_json::to_string_pretty(report).map_err(StoreError::Encode)?;
        json.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.write_error(source))?;
        }

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| self.write_error(source))?;

        info!("Saved report to {}", self.path.display());
        Ok(())
    }

    pub async fn load(&self) -> Result<R, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    path: self.path.clone(),
                })
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        debug!("Loaded {} bytes from {}", bytes.len(), self.path.display());
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}
