use std::fmt;
use std::io;

/// Errors produced while constructing a module or talking to the agent.
///
/// Per the fail-open design, only [`Error::Config`] ever reaches a caller.
/// Every other variant is logged and absorbed by the request lifecycle.
#[derive(Debug)]
pub enum Error {
    /// Invalid [`crate::config::ModuleConfig`] construction. The only
    /// variant that is allowed to escape the module and reach a caller.
    Config(String),
    /// Dialing the agent, or the round trip itself, did not complete
    /// within the configured deadline.
    Timeout,
    /// The agent socket could not be reached or the connection broke
    /// mid-exchange.
    Transport(io::Error),
    /// The wire envelope could not be encoded or decoded.
    Codec(rmp_serde::encode::Error),
    /// The wire envelope could not be decoded.
    Decode(rmp_serde::decode::Error),
    /// The agent reported an application-level error for this call.
    Agent(String),
    Message(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(v) => write!(f, "invalid module configuration: {}", v),
            Error::Timeout => write!(f, "agent call timed out"),
            Error::Transport(v) => write!(f, "agent transport: {}", v),
            Error::Codec(v) => write!(f, "agent wire encode: {}", v),
            Error::Decode(v) => write!(f, "agent wire decode: {}", v),
            Error::Agent(v) => write!(f, "agent error: {}", v),
            Error::Message(v) => write!(f, "{}", v),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::TimedOut {
            Error::Timeout
        } else {
            Error::Transport(e)
        }
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Codec(e)
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Decode(e)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Message(s)
    }
}

impl<'a> From<&'a str> for Error {
    fn from(s: &'a str) -> Self {
        Error::Message(s.to_owned())
    }
}

