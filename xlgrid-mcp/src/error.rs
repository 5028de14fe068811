use thiserror::Error;
use xlgrid_core::{ErrorKind, XlgridError};

use crate::protocol::{RpcError, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND};

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Tool [{0}] not found")]
    ToolNotFound(String),

    #[error("Method [{0}] not found")]
    MethodNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    InvalidParams(String),

    #[error(transparent)]
    Core(#[from] XlgridError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    pub fn code(&self) -> i64 {
        match self {
            McpError::ToolNotFound(_) | McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::Internal(_) => INTERNAL_ERROR,
            // A missing file is reported as invalid params, like any other bad argument.
            McpError::Core(e) => match e.kind() {
                ErrorKind::InvalidParams | ErrorKind::NotFound => INVALID_PARAMS,
                ErrorKind::Internal => INTERNAL_ERROR,
            },
        }
    }

    pub fn to_rpc(&self) -> RpcError {
        RpcError {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Deserializing request parameters; serializing a result goes through
/// [`McpError::Internal`] instead.
impl From<serde_json::Error> for McpError {
    fn from(e: serde_json::Error) -> Self {
        McpError::InvalidParams(e.to_string())
    }
}
