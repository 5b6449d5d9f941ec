// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Chart and dimension-key templates for the host charting framework.
//!
//! The host persists chart definitions keyed by these strings across
//! restarts, so the naming rules here are normative: renaming a peer must
//! produce a new dimension, never silently merge with an old one. System
//! charts are static; peer charts are rebuilt from the association list
//! after each discovery and are not mutated in place between discoveries.
//!
//! Every dimension carries the same divisor, [`crate::sampler::PRECISION`]:
//! sample values are scaled integers and the charting side divides by a
//! single constant to recover real units.

use crate::registry::{Association, PeerKind};
use crate::sampler::PRECISION;

/// How a chart should be drawn.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChartKind {
    /// Plain line chart.
    Line,
    /// Filled area chart.
    Area,
}

/// One metric series within a chart.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dimension {
    /// Key into the per-cycle metric sample.
    pub key: String,
    /// Display label, when it differs from the key.
    pub label: Option<&'static str>,
    /// Constant the host divides sampled values by.
    pub divisor: i64,
}

/// A chart definition handed to the host framework.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Chart {
    /// Stable chart identifier.
    pub id: String,
    /// Human-readable title.
    pub title: &'static str,
    /// Unit label for the value axis.
    pub units: &'static str,
    /// Menu family the chart is grouped under.
    pub family: String,
    /// Context string for templating across hosts.
    pub context: &'static str,
    /// Drawing style.
    pub kind: ChartKind,
    /// The series this chart plots.
    pub dimensions: Vec<Dimension>,
}

struct Template {
    id: &'static str,
    title: &'static str,
    units: &'static str,
    context: &'static str,
    kind: ChartKind,
    fields: &'static [(&'static str, Option<&'static str>)],
}

const SYSTEM_TEMPLATES: &[Template] = &[
    Template {
        id: "sys_offset",
        title: "Combined offset of server relative to this host",
        units: "ms",
        context: "ntp.sys_offset",
        kind: ChartKind::Area,
        fields: &[("offset", None)],
    },
    Template {
        id: "sys_jitter",
        title: "Combined system jitter and clock jitter",
        units: "ms",
        context: "ntp.sys_jitter",
        kind: ChartKind::Line,
        fields: &[("sys_jitter", Some("system")), ("clk_jitter", Some("clock"))],
    },
    Template {
        id: "sys_frequency",
        title: "Frequency offset relative to hardware clock",
        units: "ppm",
        context: "ntp.sys_frequency",
        kind: ChartKind::Area,
        fields: &[("frequency", None)],
    },
    Template {
        id: "sys_wander",
        title: "Clock frequency wander",
        units: "ppm",
        context: "ntp.sys_wander",
        kind: ChartKind::Area,
        fields: &[("clk_wander", Some("clock"))],
    },
    Template {
        id: "sys_root",
        title: "Total roundtrip delay and dispersion to the primary reference clock",
        units: "ms",
        context: "ntp.sys_root",
        kind: ChartKind::Line,
        fields: &[("rootdelay", Some("delay")), ("rootdisp", Some("dispersion"))],
    },
    Template {
        id: "sys_stratum",
        title: "Stratum (1-15)",
        units: "1",
        context: "ntp.sys_stratum",
        kind: ChartKind::Line,
        fields: &[("stratum", None)],
    },
    Template {
        id: "sys_tc",
        title: "Time constant and poll exponent (3-17)",
        units: "log2 s",
        context: "ntp.sys_tc",
        kind: ChartKind::Line,
        fields: &[("tc", Some("current")), ("mintc", Some("minimum"))],
    },
    Template {
        id: "sys_precision",
        title: "Precision",
        units: "log2 s",
        context: "ntp.sys_precision",
        kind: ChartKind::Line,
        fields: &[("precision", None)],
    },
];

const PEER_TEMPLATES: &[Template] = &[
    Template {
        id: "peer_offset",
        title: "Combined offset of server relative to this host",
        units: "ms",
        context: "ntp.peer_offset",
        kind: ChartKind::Area,
        fields: &[("offset", None)],
    },
    Template {
        id: "peer_delay",
        title: "Total roundtrip delay",
        units: "ms",
        context: "ntp.peer_delay",
        kind: ChartKind::Area,
        fields: &[("delay", None)],
    },
    Template {
        id: "peer_dispersion",
        title: "Dispersion",
        units: "ms",
        context: "ntp.peer_dispersion",
        kind: ChartKind::Area,
        fields: &[("dispersion", None)],
    },
    Template {
        id: "peer_jitter",
        title: "Combined system jitter and clock jitter",
        units: "ms",
        context: "ntp.peer_jitter",
        kind: ChartKind::Line,
        fields: &[("jitter", None)],
    },
    Template {
        id: "peer_rootdelay",
        title: "Total roundtrip delay to the primary reference clock",
        units: "ms",
        context: "ntp.peer_rootdelay",
        kind: ChartKind::Area,
        fields: &[("rootdelay", None)],
    },
    Template {
        id: "peer_rootdisp",
        title: "Dispersion to the primary reference clock",
        units: "ms",
        context: "ntp.peer_rootdisp",
        kind: ChartKind::Area,
        fields: &[("rootdisp", None)],
    },
    Template {
        id: "peer_stratum",
        title: "Stratum (1-15)",
        units: "1",
        context: "ntp.peer_stratum",
        kind: ChartKind::Line,
        fields: &[("stratum", None)],
    },
    Template {
        id: "peer_hmode",
        title: "Host mode",
        units: "1",
        context: "ntp.peer_hmode",
        kind: ChartKind::Line,
        fields: &[("hmode", None)],
    },
    Template {
        id: "peer_pmode",
        title: "Peer mode",
        units: "1",
        context: "ntp.peer_pmode",
        kind: ChartKind::Line,
        fields: &[("pmode", None)],
    },
    Template {
        id: "peer_hpoll",
        title: "Host poll exponent",
        units: "log2 s",
        context: "ntp.peer_hpoll",
        kind: ChartKind::Line,
        fields: &[("hpoll", None)],
    },
    Template {
        id: "peer_ppoll",
        title: "Peer poll exponent",
        units: "log2 s",
        context: "ntp.peer_ppoll",
        kind: ChartKind::Line,
        fields: &[("ppoll", None)],
    },
    Template {
        id: "peer_precision",
        title: "Precision",
        units: "log2 s",
        context: "ntp.peer_precision",
        kind: ChartKind::Line,
        fields: &[("precision", None)],
    },
];

/// The static system-variable charts (association id 0).
pub fn system_charts() -> Vec<Chart> {
    SYSTEM_TEMPLATES
        .iter()
        .map(|t| Chart {
            id: t.id.to_string(),
            title: t.title,
            units: t.units,
            family: "system".to_string(),
            context: t.context,
            kind: t.kind,
            dimensions: t
                .fields
                .iter()
                .map(|&(field, label)| Dimension {
                    key: field.to_string(),
                    label,
                    divisor: PRECISION,
                })
                .collect(),
        })
        .collect()
}

/// Peer charts for the current association set, one dimension per peer.
///
/// Charts are grouped into families by peer kind so reference-clock style
/// peers don't share an axis with remote servers. Call again after each
/// discovery; the result is versioned by the peer set it was built from.
pub fn peer_charts(associations: &[Association]) -> Vec<Chart> {
    let mut charts = Vec::new();
    for kind in [PeerKind::Remote, PeerKind::Unknown] {
        let peers: Vec<&Association> =
            associations.iter().filter(|a| a.kind() == kind).collect();
        if peers.is_empty() {
            continue;
        }
        for t in PEER_TEMPLATES {
            let field = t.fields[0].0;
            charts.push(Chart {
                id: format!("{}_{}", kind.label(), t.id),
                title: t.title,
                units: t.units,
                family: format!("{} peers", kind.label()),
                context: t.context,
                kind: t.kind,
                dimensions: peers
                    .iter()
                    .map(|peer| Dimension {
                        key: format!("{}_{}", peer.name(), field),
                        label: None,
                        divisor: PRECISION,
                    })
                    .collect(),
            });
        }
    }
    charts
}
