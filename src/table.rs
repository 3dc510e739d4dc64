use std::collections::BTreeMap;

use tracing::warn;

use crate::accumulator::Accumulator;
use crate::model::TableRow;

/// Per-experiment accumulators, keyed by the experiment name derived from
/// the trace filename. Rows keep first-seen order so repeated runs of the
/// same input list tabulate identically.
#[derive(Debug, Default)]
pub struct ExperimentTable {
    entries: Vec<(String, Accumulator)>,
}

impl ExperimentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == key)
    }

    /// Accumulator for `key`, created empty on first use.
    pub fn accumulator_mut(&mut self, key: &str) -> &mut Accumulator {
        if let Some(index) = self.entries.iter().position(|(existing, _)| existing == key) {
            return &mut self.entries[index].1;
        }
        self.entries.push((key.to_string(), Accumulator::new()));
        &mut self.entries.last_mut().unwrap().1
    }

    pub fn get(&self, key: &str) -> Option<&Accumulator> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, acc)| acc)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collapses the table to one row of metric means per experiment.
    /// A metric with no observations is dropped from its row (absent cell,
    /// never zero) with a diagnostic.
    pub fn to_rows(&self) -> Vec<TableRow> {
        self.entries
            .iter()
            .map(|(key, accumulator)| {
                let mut means = BTreeMap::new();
                for (metric, values) in accumulator.iter() {
                    if values.is_empty() {
                        warn!(experiment = %key, metric, "no observations, cell omitted");
                        continue;
                    }
                    let mean = values.iter().sum::<f64>() / values.len() as f64;
                    means.insert(metric.to_string(), mean);
                }
                TableRow {
                    key: key.clone(),
                    means,
                }
            })
            .collect()
    }
}
