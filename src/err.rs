//! This is the module that contains the error types used across the
//! crate.
//!
//! There are four main types:
//! * [`SerError`] - error while serializing
//! * [`DeError`] - error while deserializing
//! * [`NlError`] - top level netlink protocol and socket errors
//! * [`ConfigError`] - errors loading or writing the station
//!   configuration file
//!
//! # Design decisions
//! All errors implement [`std::error::Error`] so that they can be used
//! with [`Result`] and `?` even at the protocol error level. Per-frame
//! protocol errors never abort the medium; they are logged at the drop
//! site and the loop continues. Only initialization failures and loss
//! of the timer primitive are treated as fatal and bubble out of
//! `main`.

use std::{error::Error, fmt, io, str, string};

/// Serialization error.
#[derive(Debug)]
pub enum SerError {
    /// An arbitrary error message.
    Msg(String),
    /// Wrapped [`std::io::Error`] from the underlying buffer writes.
    Io(io::Error),
}

impl SerError {
    /// Create a new error with the given message.
    pub fn new<T>(msg: T) -> Self
    where
        T: ToString,
    {
        SerError::Msg(msg.to_string())
    }
}

impl fmt::Display for SerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SerError::Msg(ref s) => write!(f, "{}", s),
            SerError::Io(ref e) => write!(f, "IO error while serializing: {}", e),
        }
    }
}

impl Error for SerError {}

impl From<io::Error> for SerError {
    fn from(e: io::Error) -> Self {
        SerError::Io(e)
    }
}

/// Deserialization error.
#[derive(Debug)]
pub enum DeError {
    /// An arbitrary error message.
    Msg(String),
    /// The end of the buffer was reached before the type was fully
    /// parsed.
    UnexpectedEob,
    /// An exact-size payload left trailing bytes behind.
    DataLeftInBuffer,
    /// A mandatory attribute was not present in the message.
    MissingAttribute(String),
    /// Wrapped [`std::io::Error`] from the underlying buffer reads.
    Io(io::Error),
    /// A string attribute was not valid UTF-8.
    Utf8(str::Utf8Error),
}

impl DeError {
    /// Create a new error with the given message.
    pub fn new<T>(msg: T) -> Self
    where
        T: ToString,
    {
        DeError::Msg(msg.to_string())
    }
}

impl fmt::Display for DeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DeError::Msg(ref s) => write!(f, "{}", s),
            DeError::UnexpectedEob => write!(f, "unexpected end of buffer while deserializing"),
            DeError::DataLeftInBuffer => write!(f, "trailing bytes left after deserializing"),
            DeError::MissingAttribute(ref a) => write!(f, "missing mandatory attribute {}", a),
            DeError::Io(ref e) => write!(f, "IO error while deserializing: {}", e),
            DeError::Utf8(ref e) => write!(f, "invalid UTF-8 in string attribute: {}", e),
        }
    }
}

impl Error for DeError {}

impl From<io::Error> for DeError {
    fn from(e: io::Error) -> Self {
        DeError::Io(e)
    }
}

impl From<str::Utf8Error> for DeError {
    fn from(e: str::Utf8Error) -> Self {
        DeError::Utf8(e)
    }
}

impl From<string::FromUtf8Error> for DeError {
    fn from(e: string::FromUtf8Error) -> Self {
        DeError::Utf8(e.utf8_error())
    }
}

/// Top level netlink error.
#[derive(Debug)]
pub enum NlError {
    /// An arbitrary error message.
    Msg(String),
    /// The kernel answered with an error packet carrying the given
    /// negative errno value.
    Nlmsgerr(i32),
    /// Serialization error.
    Ser(SerError),
    /// Deserialization error.
    De(DeError),
    /// Wrapped [`std::io::Error`] from the socket or timer syscalls.
    Io(io::Error),
}

impl NlError {
    /// Create a new error with the given message.
    pub fn new<T>(msg: T) -> Self
    where
        T: ToString,
    {
        NlError::Msg(msg.to_string())
    }
}

impl fmt::Display for NlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            NlError::Msg(ref s) => write!(f, "{}", s),
            NlError::Nlmsgerr(code) => write!(
                f,
                "netlink error packet: {}",
                io::Error::from_raw_os_error(-code)
            ),
            NlError::Ser(ref e) => write!(f, "{}", e),
            NlError::De(ref e) => write!(f, "{}", e),
            NlError::Io(ref e) => write!(f, "{}", e),
        }
    }
}

impl Error for NlError {}

impl From<SerError> for NlError {
    fn from(e: SerError) -> Self {
        NlError::Ser(e)
    }
}

impl From<DeError> for NlError {
    fn from(e: DeError) -> Self {
        NlError::De(e)
    }
}

impl From<io::Error> for NlError {
    fn from(e: io::Error) -> Self {
        NlError::Io(e)
    }
}

/// Error loading or writing a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or written.
    Io(io::Error),
    /// The file was not valid TOML.
    Parse(toml::de::Error),
    /// The configuration could not be rendered to TOML.
    Emit(toml::ser::Error),
    /// The configuration was parseable but semantically invalid.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref e) => write!(f, "config file: {}", e),
            ConfigError::Parse(ref e) => write!(f, "config file: {}", e),
            ConfigError::Emit(ref e) => write!(f, "config file: {}", e),
            ConfigError::Invalid(ref s) => write!(f, "invalid config: {}", s),
        }
    }
}

impl Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        ConfigError::Emit(e)
    }
}
