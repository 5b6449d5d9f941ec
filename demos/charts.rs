// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Print the chart definitions a host framework would receive after
//! discovery.

fn main() -> Result<(), ntpmon::Error> {
    let mut sampler = ntpmon::Sampler::builder()
        .host("localhost")
        .port(123)
        .build()?;

    sampler.discover()?;
    for chart in sampler.charts() {
        println!("{} [{}] ({})", chart.id, chart.units, chart.title);
        for dim in &chart.dimensions {
            println!("  {} / {}", dim.key, dim.divisor);
        }
    }
    Ok(())
}
