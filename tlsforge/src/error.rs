use std::{fmt, io};

use crate::tls::enums::CipherSuite;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The negotiated cipher suite has no AEAD mapping
    UnsupportedSuite(CipherSuite),
    /// An artifact could not be computed, e.g. because the nonce parts do not fit together
    Computation(String),
    /// The AEAD backend rejected the key or nonce, or produced no ciphertext
    Crypto(String),
    /// Fewer bytes than the record layout requires
    TruncatedRecord { needed: usize, available: usize },
    /// The authentication tag did not verify
    Authentication(String),
    /// An override could not be registered
    Overlay(String),
    /// The configuration could not be loaded
    Config(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnsupportedSuite(suite) => {
                write!(f, "cipher suite {:?} has no AEAD construction", suite)
            }
            Error::Computation(msg) => write!(f, "error computing record artifact: {}", msg),
            Error::Crypto(msg) => write!(f, "error in AEAD backend: {}", msg),
            Error::TruncatedRecord { needed, available } => write!(
                f,
                "record truncated: needed {} bytes but only {} are available",
                needed, available
            ),
            Error::Authentication(msg) => write!(f, "record authentication failed: {}", msg),
            Error::Overlay(msg) => write!(f, "error registering override: {}", msg),
            Error::Config(msg) => write!(f, "error loading configuration: {}", msg),
        }
    }
}

impl From<forge::error::Error> for Error {
    fn from(err: forge::error::Error) -> Self {
        match err {
            forge::error::Error::Computation(msg) => Error::Computation(msg),
            forge::error::Error::Overlay(msg) => Error::Overlay(msg),
            forge::error::Error::Log(msg) => Error::Config(msg),
        }
    }
}

impl From<ring::error::Unspecified> for Error {
    fn from(err: ring::error::Unspecified) -> Self {
        Error::Crypto(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Config(err.to_string())
    }
}
