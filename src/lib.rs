/*!
Telemetry sampler for a running NTP daemon.

Queries the daemon's internal state and that of its configured peers over
the NTP Control Message protocol (mode 6), or the legacy private-mode
interface of older daemons, and converts the answers into a flat mapping of
dimension keys to scaled integer metrics suitable for time-series charting.

The embedding host framework owns scheduling, chart rendering, and
configuration loading; this crate owns the wire protocol, peer discovery,
round-robin sampling, and the re-discovery state machine. Nothing in here
may crash the host: every failure surfaces as a recoverable [`Error`].

# Example

```rust,no_run
fn main() -> Result<(), ntpmon::Error> {
    let mut sampler = ntpmon::Sampler::builder()
        .host("localhost")
        .port(123)
        .build()?;

    sampler.discover()?;
    for chart in sampler.charts() {
        println!("chart {} ({} dimensions)", chart.id, chart.dimensions.len());
    }

    let sample = sampler.collect()?;
    println!("offset: {:?}", sample.get("offset"));
    Ok(())
}
```
*/

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod charts;
pub mod control;
pub mod error;
pub mod registry;
pub mod sampler;
pub mod transport;
pub mod variables;

pub use error::Error;
pub use sampler::{MetricSample, ProtocolVariant, Sampler, SamplerBuilder, PRECISION};

use std::net::SocketAddr;

/// Select the appropriate bind address based on the target address family.
///
/// Returns `"0.0.0.0:0"` for IPv4 targets and `"[::]:0"` for IPv6 targets.
pub(crate) fn bind_addr_for(target: &SocketAddr) -> &'static str {
    match target {
        SocketAddr::V4(_) => "0.0.0.0:0",
        SocketAddr::V6(_) => "[::]:0",
    }
}
