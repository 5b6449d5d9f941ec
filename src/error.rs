// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for the sampler.
//!
//! Every failure in this crate is recoverable at the collection-cycle level:
//! a failed cycle yields no sample for that period and nothing else. None of
//! these variants should ever terminate the process that embeds the sampler.
//!
//! Callers that hold an `io::Result` from a lower layer can recover the
//! original variant via `io::Error::get_ref()`:
//!
//! ```no_run
//! use ntpmon::Error;
//!
//! # fn example(result: std::io::Result<()>) {
//! if let Err(e) = result {
//!     if let Some(err) = e.get_ref().and_then(|inner| inner.downcast_ref::<Error>()) {
//!         match err {
//!             Error::Timeout => eprintln!("daemon did not answer"),
//!             _ => eprintln!("sampler error: {err}"),
//!         }
//!     }
//! }
//! # }
//! ```

use std::fmt;
use std::io;

/// Errors that can occur while querying the daemon or decoding its answers.
#[derive(Debug)]
pub enum Error {
    /// No datagram arrived within the configured timeout.
    Timeout,
    /// A zero-length datagram was received.
    EmptyResponse,
    /// A binary response was too short or otherwise unparseable.
    MalformedResponse {
        /// What the decoder stumbled on.
        detail: String,
    },
    /// A textual response yielded zero `name=value` matches.
    NoFieldsParsed,
    /// The caller requested an opcode this client does not speak.
    UnsupportedOperation {
        /// The opcode value that was requested.
        opcode: u8,
    },
    /// Peer discovery found no associations, or filtering excluded them all.
    DiscoveryFailed {
        /// Why discovery came up empty.
        reason: String,
    },
    /// Underlying I/O error (socket bind, send, endpoint resolution).
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout => write!(f, "no response from daemon within timeout"),
            Error::EmptyResponse => write!(f, "daemon sent a zero-length datagram"),
            Error::MalformedResponse { detail } => {
                write!(f, "malformed control response: {detail}")
            }
            Error::NoFieldsParsed => write!(f, "response contained no parseable variables"),
            Error::UnsupportedOperation { opcode } => {
                write!(f, "unsupported control opcode: {opcode}")
            }
            Error::DiscoveryFailed { reason } => {
                write!(f, "peer discovery failed: {reason}")
            }
            Error::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        let kind = match &err {
            Error::Timeout => io::ErrorKind::TimedOut,
            Error::EmptyResponse => io::ErrorKind::UnexpectedEof,
            Error::MalformedResponse { .. } => io::ErrorKind::InvalidData,
            Error::NoFieldsParsed => io::ErrorKind::InvalidData,
            Error::UnsupportedOperation { .. } => io::ErrorKind::InvalidInput,
            Error::DiscoveryFailed { .. } => io::ErrorKind::NotFound,
            Error::Io(e) => e.kind(),
        };
        // Preserve the original io::Error directly for the Io variant.
        if let Error::Io(e) = err {
            return e;
        }
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        assert_eq!(
            Error::Timeout.to_string(),
            "no response from daemon within timeout"
        );
    }

    #[test]
    fn test_malformed_display() {
        let e = Error::MalformedResponse {
            detail: "truncated payload".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "malformed control response: truncated payload"
        );
    }

    #[test]
    fn test_unsupported_operation_display() {
        let e = Error::UnsupportedOperation { opcode: 31 };
        assert_eq!(e.to_string(), "unsupported control opcode: 31");
    }

    #[test]
    fn test_error_to_io_error_kind() {
        let cases: Vec<(Error, io::ErrorKind)> = vec![
            (Error::Timeout, io::ErrorKind::TimedOut),
            (Error::EmptyResponse, io::ErrorKind::UnexpectedEof),
            (
                Error::MalformedResponse {
                    detail: "x".to_string(),
                },
                io::ErrorKind::InvalidData,
            ),
            (Error::NoFieldsParsed, io::ErrorKind::InvalidData),
            (
                Error::UnsupportedOperation { opcode: 7 },
                io::ErrorKind::InvalidInput,
            ),
            (
                Error::DiscoveryFailed {
                    reason: "no associations".to_string(),
                },
                io::ErrorKind::NotFound,
            ),
        ];
        for (err, expected_kind) in cases {
            let io_err: io::Error = err.into();
            assert_eq!(io_err.kind(), expected_kind);
        }
    }

    #[test]
    fn test_io_error_passthrough() {
        let orig = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let kind = orig.kind();
        let err = Error::Io(orig);
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), kind);
        assert_eq!(io_err.to_string(), "reset");
    }

    #[test]
    fn test_downcast_roundtrip() {
        let err = Error::UnsupportedOperation { opcode: 9 };
        let io_err: io::Error = err.into();
        let inner = io_err.get_ref().unwrap().downcast_ref::<Error>().unwrap();
        assert!(matches!(inner, Error::UnsupportedOperation { opcode: 9 }));
    }

    #[test]
    fn test_source() {
        let err = Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "broken"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&Error::Timeout).is_none());
    }
}
