// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Blocking UDP request/response transport.
//!
//! One connectionless exchange per call: bind a fresh socket, send the
//! request, wait for a single datagram or the timeout. A long-lived socket
//! shared across calls was tried in an earlier revision of this design and
//! abandoned: after a timeout, the stale reply of the abandoned exchange can
//! arrive first and be mistaken for the answer to the next request. The
//! per-call socket is scoped to exactly one exchange and is released on
//! every exit path.

use log::debug;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::bind_addr_for;
use crate::error::Error;

/// Receive buffer size. Control-message responses fit comfortably; anything
/// larger is truncated by the kernel and will fail payload validation.
const RECV_BUF_LEN: usize = 1024;

/// A request/response channel to one daemon endpoint.
///
/// The endpoint is resolved once at construction and reused for every call;
/// it is not re-resolved per request.
#[derive(Clone, Debug)]
pub struct UdpTransport {
    target: SocketAddr,
    timeout: Duration,
}

impl UdpTransport {
    /// Resolve `addr` and create a transport with the given per-exchange
    /// timeout, measured from send to first byte received.
    pub fn new<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<UdpTransport, Error> {
        let resolved: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();
        let target = match resolved.first() {
            Some(&addr) => addr,
            None => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "address resolved to no socket addresses",
                )))
            }
        };
        Ok(UdpTransport { target, timeout })
    }

    /// The resolved daemon endpoint.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send one request and wait for one response datagram.
    ///
    /// The socket is connected so the kernel discards datagrams from other
    /// sources, and dropped before this function returns on every path.
    /// An elapsed timeout is [`Error::Timeout`]; a zero-length datagram is
    /// [`Error::EmptyResponse`]. Both mean "no sample this cycle", nothing
    /// worse.
    pub fn exchange(&self, request: &[u8]) -> Result<Vec<u8>, Error> {
        let sock = UdpSocket::bind(bind_addr_for(&self.target))?;
        sock.connect(self.target)?;
        sock.set_read_timeout(Some(self.timeout))?;
        sock.set_write_timeout(Some(self.timeout))?;

        sock.send(request)?;
        debug!("sent {} bytes to {}", request.len(), self.target);

        let mut recv_buf = [0u8; RECV_BUF_LEN];
        let recv_len = match sock.recv(&mut recv_buf) {
            Ok(len) => len,
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                debug!("no response from {} within {:?}", self.target, self.timeout);
                return Err(Error::Timeout);
            }
            Err(e) => return Err(Error::Io(e)),
        };
        debug!("recv {recv_len} bytes from {}", self.target);

        if recv_len == 0 {
            return Err(Error::EmptyResponse);
        }
        Ok(recv_buf[..recv_len].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_resolution_happens_at_construction() {
        let transport =
            UdpTransport::new("127.0.0.1:12345", Duration::from_millis(100)).unwrap();
        assert_eq!(transport.target().to_string(), "127.0.0.1:12345");
    }

    #[test]
    fn test_unresolvable_host_rejected() {
        let result = UdpTransport::new(
            "this.hostname.definitely.does.not.exist.invalid:123",
            Duration::from_millis(100),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_silent_peer_times_out() {
        // Bind a socket that never answers.
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = silent.local_addr().unwrap();

        let transport = UdpTransport::new(addr, Duration::from_millis(50)).unwrap();
        let err = transport.exchange(b"ping").unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[test]
    fn test_exchange_roundtrip() {
        let echo = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = echo.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 64];
            let (len, src) = echo.recv_from(&mut buf).unwrap();
            echo.send_to(&buf[..len], src).unwrap();
        });

        let transport = UdpTransport::new(addr, Duration::from_secs(2)).unwrap();
        let response = transport.exchange(b"hello").unwrap();
        assert_eq!(response, b"hello");
        handle.join().unwrap();
    }

    #[test]
    fn test_empty_datagram_is_distinct_from_timeout() {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = peer.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 64];
            let (_, src) = peer.recv_from(&mut buf).unwrap();
            peer.send_to(&[], src).unwrap();
        });

        let transport = UdpTransport::new(addr, Duration::from_secs(2)).unwrap();
        let err = transport.exchange(b"ping").unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
        handle.join().unwrap();
    }
}
