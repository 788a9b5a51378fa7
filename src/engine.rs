//! Import and export runs.
//!
//! Both directions are planned as a list of work items first and then run item
//! by item, so a caller can stop between two items.

/// Engine errors
mod error;
pub mod export;
pub mod import;

pub use error::EngineError;
pub use export::{
    ExportEngine,
    ExportItem,
    ExportOptions,
    ExportSummary,
    LanguageTree,
};
pub use import::{
    ImportEngine,
    ImportItem,
    ImportOptions,
    ImportSummary,
};
