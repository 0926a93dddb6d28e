use thiserror::Error;

/// Everything that can go wrong inside the evolution engine.
#[derive(Debug, Error)]
pub enum EvoError {
    /// Rejected before any simulation starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("shape mismatch in {op}: {left:?} vs {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// Crossover or copy between networks of different layouts. Always a bug.
    #[error("network topology mismatch: {0}")]
    TopologyMismatch(String),

    /// An update was requested for an agent that already died. Always a bug.
    #[error("agent is terminal and cannot be updated")]
    AgentTerminal,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("genome encode failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("genome decode failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EvoError>;
