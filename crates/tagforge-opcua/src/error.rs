//! Error types for sessions, traversal, and identity provisioning.
//!
//! Per-node failures during a browse or scan are absorbed where they occur
//! and never reach these types; only session-level problems surface.

/// Failure of a live OPC UA operation.
#[derive(Debug, thiserror::Error)]
pub enum OpcuaError {
    /// Built without the `client` feature; no live session can be opened.
    #[error("OPC UA client support is not compiled in")]
    Unavailable,

    /// A session could not be opened or authenticated.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The requested node could not be resolved or listed.
    #[error("browse failed: {0}")]
    Browse(String),
}

/// Failure while provisioning the client identity.
#[derive(Debug, thiserror::Error)]
pub enum CertError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("certificate generation failed: {0}")]
    Certificate(String),

    #[error("failed to write identity artifacts: {0}")]
    Io(#[from] std::io::Error),
}
