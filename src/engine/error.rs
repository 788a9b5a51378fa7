//! Errors of import and export runs.

use std::path::PathBuf;

use crate::codec::CodecError;
use crate::input::translation::LoadError;
use crate::lang_dir::LangDirError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Directory {} does not exist", path.display())]
    MissingDirectory { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {} ({source})", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Files(#[from] LangDirError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LoadError> for EngineError {
    fn from(error: LoadError) -> Self {
        match error {
            LoadError::Io { path, source } => Self::Io { path, source },
            LoadError::Parse { path, source } => Self::Parse { path, source },
        }
    }
}
