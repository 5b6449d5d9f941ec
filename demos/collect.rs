// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Collect one sample from a local NTP daemon and print every dimension.

fn main() -> Result<(), ntpmon::Error> {
    let mut sampler = ntpmon::Sampler::builder()
        .host("localhost")
        .port(123)
        .build()?;

    sampler.discover()?;
    let sample = sampler.collect()?;
    for (dimension, value) in &sample {
        println!("{dimension:<40} {value}");
    }
    Ok(())
}
