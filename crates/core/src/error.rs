use thiserror::Error;

/// Startup configuration errors. All of these are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("resource {name} does not exist. Available resources: {available}")]
    UnknownResource { name: String, available: String },
    #[error("invalid metric regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("shard {shard} out of range for {total} total shards")]
    InvalidShard { shard: u32, total: u32 },
    #[error("invalid allow list {0:?} (expect resource=[key,...],...)")]
    InvalidAllowList(String),
}
