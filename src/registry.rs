// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Discovered peer associations and the round-robin sampling cursor.
//!
//! The daemon assigns every peer an opaque numeric association id. Discovery
//! asks for the full id list (READSTAT), then interrogates each id (READVAR)
//! to derive a stable display name from its source address and reference id.
//! The surviving associations are held here, sorted ascending by id so that
//! dimension keys are reproducible across restarts, together with their
//! pre-encoded request buffers and failure counters.
//!
//! Re-discovery replaces the entire contents; there is no merging with the
//! previous peer set.

use log::debug;

use crate::control::{self, ControlHeader, Opcode};
use crate::error::Error;
use crate::transport::UdpTransport;
use crate::variables;

/// How a peer's display name was derived, used to group charts into
/// families.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PeerKind {
    /// Named from a reachable source address.
    Remote,
    /// No source address reported; named from the numeric association id.
    Unknown,
}

impl PeerKind {
    /// Lowercase label used in chart family names.
    pub fn label(&self) -> &'static str {
        match self {
            PeerKind::Remote => "remote",
            PeerKind::Unknown => "unknown",
        }
    }
}

/// One peer known to the daemon.
///
/// Owned exclusively by the [`Registry`]; discarded and rebuilt wholesale on
/// re-discovery.
#[derive(Clone, Debug)]
pub struct Association {
    id: u16,
    name: String,
    kind: PeerKind,
    request: [u8; control::HEADER_LEN],
    error_count: u32,
}

impl Association {
    /// The daemon-assigned association id.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// The derived display name used as the dimension-key prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the name was derived.
    pub fn kind(&self) -> PeerKind {
        self.kind
    }

    /// The pre-encoded READVAR request for this association.
    pub fn request(&self) -> &[u8] {
        &self.request
    }

    /// Consecutive failed samples since the last success.
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Record a successful sample, clearing the failure streak.
    pub fn record_success(&mut self) {
        self.error_count = 0;
    }

    /// Record a failed or empty sample; returns the new streak length.
    pub fn record_failure(&mut self) -> u32 {
        self.error_count += 1;
        self.error_count
    }
}

/// Derive a peer's display name and kind from its READVAR variables.
///
/// Dots in the source address become dashes (dots are reserved in dimension
/// keys). The all-zero address and loopback (`127-`) peers are placeholders,
/// not telemetry, and are excluded entirely. A reference-clock id, when
/// present, is appended lower-cased to disambiguate peers sharing an address
/// pattern. With no source address at all the numeric id serves as the name.
fn peer_identity(
    id: u16,
    srcadr: Option<&str>,
    refid: Option<&str>,
) -> Option<(String, PeerKind)> {
    let (mut name, kind) = match srcadr {
        Some(addr) => {
            let name = addr.replace('.', "-");
            if name == "0-0-0-0" || name.starts_with("127-") {
                return None;
            }
            (name, PeerKind::Remote)
        }
        None => (id.to_string(), PeerKind::Unknown),
    };
    if let Some(refid) = refid {
        name.push('_');
        name.push_str(&refid.to_lowercase());
    }
    Some((name, kind))
}

/// The set of discovered associations plus the round-robin cursor.
#[derive(Debug)]
pub struct Registry {
    associations: Vec<Association>,
    cursor: usize,
    system_request: [u8; control::HEADER_LEN],
}

impl Registry {
    /// Create an empty registry with a pre-encoded system-variables request
    /// (READVAR for association id 0, the daemon itself).
    pub fn new() -> Result<Registry, Error> {
        let system_request = ControlHeader::request(0, Opcode::ReadVar).encode()?;
        Ok(Registry {
            associations: Vec::new(),
            cursor: 0,
            system_request,
        })
    }

    /// The READVAR request for the daemon's own system variables.
    pub fn system_request(&self) -> &[u8] {
        &self.system_request
    }

    /// The current associations, ascending by id.
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    /// Whether discovery has produced any peers.
    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }

    /// Select the next peer round-robin and advance the cursor.
    ///
    /// Exactly one peer is sampled per collection cycle, so the outbound
    /// request count stays bounded regardless of how many peers the daemon
    /// tracks.
    pub fn next_peer(&mut self) -> Option<&mut Association> {
        if self.associations.is_empty() {
            return None;
        }
        let index = self.cursor % self.associations.len();
        self.cursor = (index + 1) % self.associations.len();
        Some(&mut self.associations[index])
    }

    /// Run discovery, replacing the entire association set.
    ///
    /// A peer that fails its READVAR probe or yields no parseable variables
    /// is skipped; partial discovery is acceptable. Only when *no*
    /// association survives does discovery fail. On any failure the
    /// registry is left empty, so peer sampling stays disabled until a
    /// later discovery succeeds.
    pub fn discover(&mut self, transport: &UdpTransport) -> Result<(), Error> {
        self.associations.clear();
        self.cursor = 0;
        let readstat = ControlHeader::request(0, Opcode::ReadStat).encode()?;
        let response = transport.exchange(&readstat)?;
        let mut ids = control::extract_association_ids(&response)?;
        ids.sort_unstable();

        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let request = ControlHeader::request(id, Opcode::ReadVar).encode()?;
            let response = match transport.exchange(&request) {
                Ok(response) => response,
                Err(e) => {
                    debug!("association {id}: readvar failed during discovery: {e}");
                    continue;
                }
            };
            let text = match control::payload_text(&response) {
                Ok(text) => text,
                Err(e) => {
                    debug!("association {id}: {e}");
                    continue;
                }
            };
            if variables::parse_fields(&text).is_empty() {
                debug!("association {id}: no variables in readvar response");
                continue;
            }
            let srcadr = variables::parse_source_address(&text);
            let refid = variables::parse_reference_id(&text);
            match peer_identity(id, srcadr.as_deref(), refid.as_deref()) {
                Some((name, kind)) => found.push(Association {
                    id,
                    name,
                    kind,
                    request,
                    error_count: 0,
                }),
                None => debug!("association {id}: placeholder peer excluded"),
            }
        }

        if found.is_empty() {
            return Err(Error::DiscoveryFailed {
                reason: "no associations survived discovery".to_string(),
            });
        }
        self.associations = found;
        Ok(())
    }
}
