#![forbid(unsafe_code)]

use rv_core::{TaxonomyError, TransportError};
use rv_storage::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("taxonomy: {0}")]
    Taxonomy(#[from] TaxonomyError),
    #[error("taxonomy file {path}: {source}")]
    TaxonomyFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no folder or file named {0:?} in the current snapshot")]
    UnknownScope(String),
    #[error("{0:?} is not a file")]
    NotAFile(String),
}
