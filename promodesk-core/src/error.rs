// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Local validation failures. These never reach the network layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid time format: {0:?}")]
    InvalidTimeFormat(String),

    #[error("Invalid time values: {0:?}")]
    InvalidTimeValues(String),

    #[error("The end {until} must be after the start {since}")]
    InvalidInterval { since: String, until: String },

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("The field {0} is required")]
    MissingField(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Cancelled on purpose (e.g. the owning screen went away).
    #[error("The request was aborted")]
    Aborted,

    #[error("The operation timed out")]
    TimedOut,

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Can't decode the response: {0}")]
    Decode(String),
}

impl RequestError {
    pub fn server(status: u16, message: Option<String>) -> Self {
        let message = match message {
            Some(m) if !m.trim().is_empty() => m,
            _ => format!("Request failed with status {status}"),
        };
        Self::Server { status, message }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, RequestError::Aborted)
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, RequestError::Aborted | RequestError::TimedOut)
    }
}
