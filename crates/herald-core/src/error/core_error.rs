//! Core errors - failures while decoding gateway dispatches

use thiserror::Error;

use crate::dispatch::DispatchType;

/// Core layer errors
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Failed to decode {dispatch} payload: {source}")]
    PayloadDecode {
        dispatch: DispatchType,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Snowflake(#[from] crate::value_objects::SnowflakeParseError),
}

impl CoreError {
    pub fn decode(dispatch: DispatchType, source: serde_json::Error) -> Self {
        Self::PayloadDecode { dispatch, source }
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
