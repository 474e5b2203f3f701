//! Metric identifiers and per-run metric sets.
//!
//! A [`MetricSet`] always carries all three metrics; each one is either a
//! finite number or absent. Absent means the producing tool gave no usable
//! result and is never coerced to zero.

use serde::{Deserialize, Serialize};

/// The three metrics recorded per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Interface-contact score (ipSAE).
    Ipsae,
    /// Docking-quality score derived alongside ipSAE (pDockQ2).
    Pdockq2,
    /// Estimated dissociation constant in molar units (PRODIGY Kd).
    ProdigyKd,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [MetricKind::Ipsae, MetricKind::Pdockq2, MetricKind::ProdigyKd];

    /// Column name used in the tabular store.
    pub fn column(self) -> &'static str {
        match self {
            MetricKind::Ipsae => "ipsae",
            MetricKind::Pdockq2 => "pdockq2",
            MetricKind::ProdigyKd => "prodigy_kd",
        }
    }

    /// Render a value the way it is written into the store.
    /// Both forms round-trip exactly through `f64::from_str`.
    pub fn format_value(self, value: f64) -> String {
        match self {
            MetricKind::ProdigyKd => format!("{:e}", value),
            MetricKind::Ipsae | MetricKind::Pdockq2 => value.to_string(),
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    ipsae: Option<f64>,
    pdockq2: Option<f64>,
    prodigy_kd: Option<f64>,
}

impl MetricSet {
    /// All three metrics absent.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn new(ipsae: Option<f64>, pdockq2: Option<f64>, prodigy_kd: Option<f64>) -> Self {
        let mut set = Self::default();
        set.set(MetricKind::Ipsae, ipsae);
        set.set(MetricKind::Pdockq2, pdockq2);
        set.set(MetricKind::ProdigyKd, prodigy_kd);
        set
    }

    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        match kind {
            MetricKind::Ipsae => self.ipsae,
            MetricKind::Pdockq2 => self.pdockq2,
            MetricKind::ProdigyKd => self.prodigy_kd,
        }
    }

    /// Store a value; NaN and infinities are recorded as absent.
    pub fn set(&mut self, kind: MetricKind, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite());
        match kind {
            MetricKind::Ipsae => self.ipsae = value,
            MetricKind::Pdockq2 => self.pdockq2 = value,
            MetricKind::ProdigyKd => self.prodigy_kd = value,
        }
    }

    /// Iterate all three metrics in column order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, Option<f64>)> + '_ {
        MetricKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    /// Only the metrics that carry a value.
    pub fn present(&self) -> impl Iterator<Item = (MetricKind, f64)> + '_ {
        self.iter().filter_map(|(kind, value)| value.map(|v| (kind, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

/// Metrics collected for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub run_id: String,
    pub metrics: MetricSet,
}

/// Per-run metric sets in discovery order, handed to the store once per batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateUpdate {
    entries: Vec<RunMetrics>,
}

impl AggregateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a run. A run id already present is replaced in place, so each
    /// run contributes at most one entry.
    pub fn insert(&mut self, run_id: impl Into<String>, metrics: MetricSet) {
        let run_id = run_id.into();
        match self.entries.iter_mut().find(|e| e.run_id == run_id) {
            Some(existing) => existing.metrics = metrics,
            None => self.entries.push(RunMetrics { run_id, metrics }),
        }
    }

    pub fn get(&self, run_id: &str) -> Option<&MetricSet> {
        self.entries.iter().find(|e| e.run_id == run_id).map(|e| &e.metrics)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunMetrics> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
