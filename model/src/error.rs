use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unrecognized status '{status}' for test case {identifier}")]
    UnrecognizedStatus { identifier: String, status: String },

    #[error("Unexpected {node_type} node '{name}' {context}")]
    UnexpectedNode {
        node_type: String,
        name: String,
        context: String,
    },

    #[error("The bundle contains no code coverage data")]
    CoverageUnavailable,
}

impl ModelError {
    /// Whether the report can still be produced without the failing part
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ModelError::CoverageUnavailable)
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
