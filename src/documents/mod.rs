//! Document loading and chunking.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::Metadata;

pub mod loader;
pub mod splitter;

pub use loader::{DocumentLoader, FsLoader};
pub use splitter::TextSplitter;

/// A piece of text with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed {path}: {reason}")]
    Malformed { path: String, reason: String },
}
