// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Shared test helpers: a scriptable loopback daemon.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use ntpmon::control::{ControlHeader, Opcode};

/// System-variable READVAR payload served for association id 0.
pub const SYSTEM_TEXT: &str = "associd=0 status=0615 leap_none, sync_ntp, clock_sync,\r\n\
     stratum=2, precision=-24, rootdelay=1.062, rootdisp=35.497, tc=10, mintc=3,\r\n\
     offset=0.001234, frequency=-17.896, sys_jitter=0.412, clk_jitter=0.201, clk_wander=0.002,";

/// One peer the mock daemon reports via READSTAT.
#[derive(Clone, Copy)]
pub struct MockPeer {
    pub id: u16,
    pub srcadr: Option<&'static str>,
    pub refid: Option<&'static str>,
}

fn peer_text(peer: &MockPeer) -> String {
    let mut text = String::new();
    if let Some(srcadr) = peer.srcadr {
        text.push_str(&format!("srcadr={srcadr}, srcport=123, "));
    }
    if let Some(refid) = peer.refid {
        text.push_str(&format!("refid={refid}, "));
    }
    text.push_str(
        "stratum=2, precision=-24, rootdelay=1.0, rootdisp=2.0, hmode=3, pmode=4, \
         hpoll=6, ppoll=6, offset=0.5, delay=1.5, dispersion=2.5, jitter=0.25,",
    );
    text
}

fn control_response(associd: u16, opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    let mut header = ControlHeader::request(associd, opcode);
    header.response = true;
    header.count = payload.len() as u16;
    let mut buf = header.encode().unwrap().to_vec();
    buf.extend_from_slice(payload);
    buf
}

/// A daemon stand-in answering READSTAT/READVAR (or the private-mode magic
/// payload) on a loopback port until dropped.
pub struct MockDaemon {
    addr: SocketAddr,
    readstat_count: Arc<AtomicUsize>,
    peers_healthy: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MockDaemon {
    /// Spawn a control-mode daemon tracking the given peers.
    pub fn spawn(peers: Vec<MockPeer>) -> MockDaemon {
        Self::spawn_inner(peers, None)
    }

    /// Spawn a legacy private-mode daemon answering every request with the
    /// given text blob (no control framing).
    pub fn spawn_private(text: &'static str) -> MockDaemon {
        Self::spawn_inner(Vec::new(), Some(text))
    }

    fn spawn_inner(peers: Vec<MockPeer>, private_text: Option<&'static str>) -> MockDaemon {
        let sock = UdpSocket::bind("127.0.0.1:0").expect("bind mock daemon");
        sock.set_read_timeout(Some(Duration::from_millis(25)))
            .expect("set mock timeout");
        let addr = sock.local_addr().expect("mock local addr");

        let readstat_count = Arc::new(AtomicUsize::new(0));
        let peers_healthy = Arc::new(AtomicBool::new(true));
        let running = Arc::new(AtomicBool::new(true));

        let thread_readstat = Arc::clone(&readstat_count);
        let thread_healthy = Arc::clone(&peers_healthy);
        let thread_running = Arc::clone(&running);

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 512];
            while thread_running.load(Ordering::SeqCst) {
                let (len, src) = match sock.recv_from(&mut buf) {
                    Ok(received) => received,
                    Err(_) => continue,
                };
                let request = &buf[..len];
                let response = if let Some(text) = private_text {
                    text.as_bytes().to_vec()
                } else {
                    match answer_control(request, &peers, &thread_readstat, &thread_healthy) {
                        Some(response) => response,
                        None => continue,
                    }
                };
                let _ = sock.send_to(&response, src);
            }
        });

        MockDaemon {
            addr,
            readstat_count,
            peers_healthy,
            running,
            handle: Some(handle),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of READSTAT (discovery) requests seen so far.
    pub fn readstat_count(&self) -> usize {
        self.readstat_count.load(Ordering::SeqCst)
    }

    /// When false, peer READVAR requests are answered with an empty payload.
    pub fn set_peers_healthy(&self, healthy: bool) {
        self.peers_healthy.store(healthy, Ordering::SeqCst);
    }
}

impl Drop for MockDaemon {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn answer_control(
    request: &[u8],
    peers: &[MockPeer],
    readstat_count: &AtomicUsize,
    peers_healthy: &AtomicBool,
) -> Option<Vec<u8>> {
    if request.len() < 12 {
        return None;
    }
    let opcode = request[1] & 0x1f;
    let associd = u16::from_be_bytes([request[6], request[7]]);
    match opcode {
        1 => {
            readstat_count.fetch_add(1, Ordering::SeqCst);
            let mut payload = Vec::new();
            for peer in peers {
                payload.extend_from_slice(&peer.id.to_be_bytes());
                payload.extend_from_slice(&0x9624u16.to_be_bytes());
            }
            Some(control_response(0, Opcode::ReadStat, &payload))
        }
        2 if associd == 0 => Some(control_response(0, Opcode::ReadVar, SYSTEM_TEXT.as_bytes())),
        2 => {
            let peer = peers.iter().find(|p| p.id == associd)?;
            if peers_healthy.load(Ordering::SeqCst) {
                let text = peer_text(peer);
                Some(control_response(associd, Opcode::ReadVar, text.as_bytes()))
            } else {
                // Answer, but with nothing parseable in the payload.
                Some(control_response(associd, Opcode::ReadVar, &[]))
            }
        }
        _ => None,
    }
}
