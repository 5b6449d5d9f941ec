// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! One-cycle orchestration: system variables, one round-robin peer, scaling.
//!
//! The host framework calls [`Sampler::collect`] once per poll interval from
//! a single thread; the sampler issues at most two blocking request/response
//! exchanges per cycle and never overlaps cycles. System metrics are
//! mandatory: a cycle without them fails outright. Peer metrics are best
//! effort: a peer that keeps failing eventually triggers a full
//! re-discovery, while the cycle still returns whatever the system query
//! produced.
//!
//! # Examples
//!
//! ```no_run
//! # fn example() -> Result<(), ntpmon::Error> {
//! let mut sampler = ntpmon::Sampler::builder()
//!     .host("localhost")
//!     .port(123)
//!     .build()?;
//!
//! // Once per poll interval:
//! let sample = sampler.collect()?;
//! for (dimension, value) in &sample {
//!     println!("{dimension} = {value}");
//! }
//! # Ok(())
//! # }
//! ```

use log::{debug, warn};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::charts::{self, Chart};
use crate::control;
use crate::error::Error;
use crate::registry::Registry;
use crate::transport::UdpTransport;
use crate::variables::{self, VariableSet};

/// Fixed multiplier applied to every sampled value before integer
/// truncation.
///
/// Uniform across all fields, including those that are already integral
/// (stratum, poll exponents), so every chart dimension divides by the same
/// constant.
pub const PRECISION: i64 = 1_000_000;

/// Default per-exchange timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default consecutive-failure threshold before a peer triggers
/// re-discovery.
pub const DEFAULT_MAX_PEER_ERRORS: u32 = 5;

/// One cycle's worth of metrics: dimension key to scaled integer value.
pub type MetricSample = BTreeMap<String, i64>;

/// The daemon interface to query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProtocolVariant {
    /// NTP control messages (mode 6): READSTAT discovery plus per-peer
    /// READVAR sampling.
    Control,
    /// The legacy private-mode interface of older daemons: a fixed magic
    /// request whose free-text answer carries system variables only.
    Private,
}

/// The known field set of a private-mode response.
///
/// The legacy interface predates variable negotiation, so anything outside
/// this list in the free-text blob is noise and is dropped.
const PRIVATE_FIELDS: &[&str] = &[
    "stratum",
    "precision",
    "rootdelay",
    "rootdisp",
    "tc",
    "mintc",
    "offset",
    "frequency",
    "sys_jitter",
    "clk_jitter",
    "clk_wander",
];

fn scale(value: f64) -> i64 {
    (value * PRECISION as f64) as i64
}

/// Builder for configuring and creating a [`Sampler`].
pub struct SamplerBuilder {
    host: String,
    port: u16,
    timeout: Duration,
    variant: ProtocolVariant,
    max_peer_errors: u32,
}

impl SamplerBuilder {
    fn new() -> Self {
        SamplerBuilder {
            host: "localhost".to_string(),
            port: 123,
            timeout: DEFAULT_TIMEOUT,
            variant: ProtocolVariant::Control,
            max_peer_errors: DEFAULT_MAX_PEER_ERRORS,
        }
    }

    /// Set the daemon host (default: `localhost`).
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the daemon port (default: 123).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the per-exchange timeout (default: 5 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Select the daemon interface (default: [`ProtocolVariant::Control`]).
    pub fn variant(mut self, variant: ProtocolVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Set the consecutive-failure threshold after which a peer triggers
    /// full re-discovery (default: 5).
    pub fn max_peer_errors(mut self, max: u32) -> Self {
        self.max_peer_errors = max;
        self
    }

    /// Build the sampler. Resolves the endpoint once; no request is sent
    /// until [`Sampler::collect`] or [`Sampler::discover`].
    pub fn build(self) -> Result<Sampler, Error> {
        let transport = UdpTransport::new((self.host.as_str(), self.port), self.timeout)?;
        Ok(Sampler {
            transport,
            registry: Registry::new()?,
            variant: self.variant,
            max_peer_errors: self.max_peer_errors,
            rediscover: self.variant == ProtocolVariant::Control,
        })
    }
}

/// Telemetry sampler for one NTP daemon.
///
/// Created via [`Sampler::builder()`]. Single-threaded by design: the caller
/// must not start a new cycle before the previous one returns, and no
/// locking exists because none is needed.
pub struct Sampler {
    transport: UdpTransport,
    registry: Registry,
    variant: ProtocolVariant,
    max_peer_errors: u32,
    /// Discovery is pending: initially, or after a peer crossed the error
    /// threshold, or after a previous discovery attempt failed.
    rediscover: bool,
}

impl Sampler {
    /// Create a builder with defaults.
    pub fn builder() -> SamplerBuilder {
        SamplerBuilder::new()
    }

    /// Run peer discovery now instead of lazily on the first cycle.
    ///
    /// For the private variant this degenerates to a connectivity probe:
    /// one exchange whose answer must contain parseable variables.
    pub fn discover(&mut self) -> Result<(), Error> {
        match self.variant {
            ProtocolVariant::Control => {
                self.registry.discover(&self.transport)?;
                self.rediscover = false;
                debug!("discovered {} peers", self.registry.associations().len());
                Ok(())
            }
            ProtocolVariant::Private => {
                let vars = self.system_variables()?;
                if vars.is_empty() {
                    return Err(Error::NoFieldsParsed);
                }
                Ok(())
            }
        }
    }

    /// Chart definitions for the current peer set.
    ///
    /// Versioned by the peer set: call again after [`discover`] succeeds or
    /// a re-discovery is triggered, and replace the previous definitions
    /// wholesale.
    ///
    /// [`discover`]: Sampler::discover
    pub fn charts(&self) -> Vec<Chart> {
        let mut all = charts::system_charts();
        all.extend(charts::peer_charts(self.registry.associations()));
        all
    }

    /// Run one collection cycle.
    ///
    /// Failure leaves no partial state behind: the registry's error counters
    /// and cursor advance as specified, but no half-built sample is ever
    /// returned.
    pub fn collect(&mut self) -> Result<MetricSample, Error> {
        if self.variant == ProtocolVariant::Control && self.rediscover {
            match self.registry.discover(&self.transport) {
                Ok(()) => {
                    self.rediscover = false;
                    debug!("discovered {} peers", self.registry.associations().len());
                }
                // Leave the flag set: peer metrics stay disabled and the
                // next cycle retries. System metrics continue below.
                Err(e) => debug!("peer discovery failed: {e}"),
            }
        }

        let mut data = MetricSample::new();

        // System variables are mandatory; any failure fails the cycle.
        let vars = self.system_variables()?;
        if vars.is_empty() {
            return Err(Error::NoFieldsParsed);
        }
        for (name, value) in vars.iter() {
            data.insert(name.to_string(), scale(value));
        }

        // Exactly one peer per cycle, round-robin; never fatal to the cycle.
        if self.variant == ProtocolVariant::Control {
            self.sample_one_peer(&mut data);
        }

        Ok(data)
    }

    /// Query the daemon's own variables (association id 0, or the legacy
    /// magic payload).
    fn system_variables(&self) -> Result<VariableSet, Error> {
        match self.variant {
            ProtocolVariant::Control => {
                let response = self.transport.exchange(self.registry.system_request())?;
                let text = control::payload_text(&response)?;
                Ok(variables::parse_fields(&text))
            }
            ProtocolVariant::Private => {
                let response = self.transport.exchange(&control::PRIVATE_REQUEST)?;
                // No control framing: the whole datagram is the text blob.
                let text = String::from_utf8_lossy(&response).into_owned();
                let mut vars = variables::parse_fields(&text);
                vars.retain_known(PRIVATE_FIELDS);
                Ok(vars)
            }
        }
    }

    /// Sample the next peer in round-robin order into `data`.
    fn sample_one_peer(&mut self, data: &mut MetricSample) {
        let transport = &self.transport;
        let max_peer_errors = self.max_peer_errors;
        let mut rediscover = false;

        if let Some(assoc) = self.registry.next_peer() {
            let outcome = transport
                .exchange(assoc.request())
                .and_then(|response| control::payload_text(&response))
                .map(|text| variables::parse_fields(&text))
                .and_then(|vars| {
                    if vars.is_empty() {
                        Err(Error::NoFieldsParsed)
                    } else {
                        Ok(vars)
                    }
                });
            match outcome {
                Ok(vars) => {
                    assoc.record_success();
                    for (field, value) in vars.iter() {
                        data.insert(format!("{}_{}", assoc.name(), field), scale(value));
                    }
                }
                Err(e) => {
                    let count = assoc.record_failure();
                    debug!(
                        "peer {}: sample failed ({e}), {count} consecutive failures",
                        assoc.name()
                    );
                    if count > max_peer_errors {
                        warn!(
                            "peer {}: {count} consecutive failures, scheduling re-discovery",
                            assoc.name()
                        );
                        rediscover = true;
                    }
                }
            }
        }

        if rediscover {
            self.rediscover = true;
        }
    }
}
