use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    /// The natural producer of a computed value could not run, e.g. because key material is
    /// missing
    Computation(String),
    /// An override could not be registered, e.g. because the value was already resolved
    Overlay(String),
    /// The logging backend could not be configured
    Log(String),
}

impl std::error::Error for Error {}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Computation(message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Computation(msg) => write!(f, "error computing a value: {}", msg),
            Error::Overlay(msg) => write!(f, "error registering an override: {}", msg),
            Error::Log(msg) => write!(f, "error configuring logging: {}", msg),
        }
    }
}
