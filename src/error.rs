//! Top-level error aggregation
//!
//! Individual protocol layers (SDP, RTSP, crypto) define their own focused error types;
//! [`ReceiverError`] in `receiver::server` aggregates those for the accept loop. This
//! module holds the crate-wide kinds that don't belong to any single layer.

/// Crate-wide error kind
#[derive(Debug, thiserror::Error)]
pub enum AirPlayError {
    /// Malformed SDP, base64, or Transport header; the caller should respond 400 and
    /// close the connection.
    #[error("malformed protocol data: {0}")]
    ProtocolMalformed(String),

    /// No free port remained in the allocation window; the caller should respond 500.
    #[error("no free port available")]
    ResourceExhausted,

    /// Internal pipeline construction failure; the caller should respond 500 and tear
    /// down any partially built pipeline.
    #[error("pipeline construction failed: {0}")]
    PipelineFailed(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
