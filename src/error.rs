//! Error types for zipserve

use thiserror::Error;

/// Errors raised while loading configuration or resolving configured values
/// for a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid route pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid template {template}: {message}")]
    InvalidTemplate { template: String, message: String },

    #[error("Route {pattern} has no {directive} value and none is inherited")]
    MissingDirective { pattern: String, directive: &'static str },

    #[error("Template {template} evaluated to an empty value")]
    EmptyValue { template: String },

    #[error("Template {template} produced a value that is not valid UTF-8")]
    InvalidEncoding { template: String },

    #[error("Request path {path} is not valid UTF-8 or climbs above the root")]
    InvalidPath { path: String },

    #[error("Request path {0} does not match the route")]
    RouteMismatch(String),
}

/// Failures reported by an archive backend.
///
/// Each variant corresponds to one primitive failure of the backend so the
/// handler can map it to a fixed response status.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("No such archive file: {path}")]
    ArchiveNotFound { path: String },

    #[error("{path} is not a valid archive: {message}")]
    InvalidArchive { path: String, message: String },

    #[error("No entry {entry} inside archive")]
    EntryNotFound { entry: String },

    #[error("Failed to open entry {entry}: {message}")]
    StreamOpen { entry: String, message: String },

    #[error("Failed to read entry {entry}: {message}")]
    Read { entry: String, message: String },
}

/// Terminal outcome of a failed extraction, mapped to an HTTP status.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Not found")]
    NotFound,

    #[error("Internal server error")]
    Internal,
}

impl ExtractError {
    /// Convert the outcome to its HTTP status code
    pub fn to_http_status(&self) -> u16 {
        match self {
            ExtractError::MethodNotAllowed => 405,
            ExtractError::NotFound => 404,
            ExtractError::Internal => 500,
        }
    }
}

/// Error returned by the handler when no response may be sent at all.
///
/// The host reacts by aborting the request without writing a status line.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Failed to resolve configuration settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build response: {0}")]
    Response(#[from] http::Error),
}
