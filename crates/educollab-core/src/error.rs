//! Error types for `educollab-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The durable backend failed to read or write.
  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A stored value exists but does not decode. Treated as fatal at startup.
  #[error("stored value under {key:?} is malformed: {source}")]
  Corrupt {
    key:    String,
    #[source]
    source: serde_json::Error,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("credential error: {0}")]
  Credential(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
