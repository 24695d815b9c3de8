//! Dataset source backed by a directory of decoded JSON datasets.
//!
//! Layout: `{root}/{cycle}/{VAR}/{file_name}.json`, e.g.
//! `data/decoded/2025112500/SNOD/gfs.t00z.pgrb2.0p25.f006.json`.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use point_series::{DatasetHandle, DatasetRequest, DatasetSource, DecodedDataset, Result};
use tracing::{debug, warn};

pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Location of the decoded dataset for a request.
    pub fn path_for(&self, request: &DatasetRequest) -> PathBuf {
        self.root
            .join(request.cycle.to_string())
            .join(&request.variable)
            .join(format!("{}.json", request.file_name()))
    }
}

#[async_trait]
impl DatasetSource for DirectorySource {
    async fn fetch(&self, request: &DatasetRequest) -> Result<Option<DatasetHandle>> {
        let path = self.path_for(request);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Dataset not present");
                return Ok(None);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read dataset");
                return Ok(None);
            }
        };

        match DecodedDataset::from_json_slice(&bytes) {
            Ok(dataset) => {
                debug!(
                    path = %path.display(),
                    variables = dataset.variables.len(),
                    "Loaded dataset"
                );
                Ok(Some(Box::new(dataset) as DatasetHandle))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to decode dataset");
                Ok(None)
            }
        }
    }
}
