use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;

/// Error categories for parsing route lists and mutating an aggregation trie.
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    #[error("could not parse prefix")]
    ParseError,
    #[error("address family mismatch")]
    AddressFamilyError,
    #[error("invalid operation")]
    InvalidOperationError,
    #[error("File error")]
    FileError,
    #[error("could not serialize json")]
    SerializeError,
}

/// Represents an error that occurred during execution, including an error kind
/// and a detailed message describing the issue.
#[derive(Error, PartialEq, Eq, Clone)]
pub struct AppError {
    pub error_kind: AppErrorKind,
    pub message: String,
}

impl Debug for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_kind, self.message)
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_kind, self.message)
    }
}

impl AppError {
    pub fn new(error_kind: AppErrorKind, message: &str) -> Self {
        Self {
            error_kind,
            message: message.to_owned(),
        }
    }
}

/// I/O failures while reading route lists or writing the graph file.
impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::new(AppErrorKind::FileError, &value.to_string())
    }
}

/// Invalid addresses or mask lengths rejected by `ipnetwork`.
impl From<ipnetwork::IpNetworkError> for AppError {
    fn from(value: ipnetwork::IpNetworkError) -> Self {
        Self::new(AppErrorKind::ParseError, &value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::new(AppErrorKind::SerializeError, &value.to_string())
    }
}
