// error.rs
use thiserror::Error;

/// Failure classes of the panel. Nothing here is retried: auth and
/// connection failures halt startup, everything else is logged and leaves
/// the panel where it was.
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("identity exchange failed: {0}")]
    Auth(String),
    #[error("shadow read failed: {0}")]
    SnapshotRead(String),
    #[error("malformed shadow document: {0}")]
    MalformedShadow(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("subscribe failed on {topic}: {reason}")]
    Subscribe { topic: String, reason: String },
    #[error("publish failed on {topic}: {reason}")]
    Publish { topic: String, reason: String },
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}
