use std::collections::BTreeMap;

use serde::Serialize;

/// One accepted trace document, with its hash for provenance.
#[derive(Debug, Clone, Serialize)]
pub struct TraceSource {
    pub filename: String,
    pub experiment: String,
    pub sha256: String,
}

/// One tabulated experiment: metric name → mean of its observations.
/// Metrics without observations are simply absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub key: String,
    pub means: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub struct AggregateManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub document_count: usize,
    pub experiment_count: usize,
    pub sources: Vec<TraceSource>,
    pub skipped: Vec<String>,
    pub rows: Vec<TableRow>,
}
