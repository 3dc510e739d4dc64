use std::collections::BTreeMap;

use crate::error::{ExtractError, Result};
use crate::extract::ExtractedRecord;

/// Append-only multi-value map collecting repeated observations of the
/// same metric across runs. A key, once present, only ever grows; values
/// keep their append order.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    observations: BTreeMap<String, Vec<f64>>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, metric: &str, value: f64) {
        self.observations
            .entry(metric.to_string())
            .or_default()
            .push(value);
    }

    /// Appends every metric of one extracted record, in record order.
    pub fn merge_record(&mut self, record: &ExtractedRecord) {
        for (metric, value) in record {
            self.append(metric, *value);
        }
    }

    /// Installs a whole observation series at once. Reserved for the
    /// log-derived series; the per-document path always appends, so a
    /// collision here is a caller bug.
    pub fn set_once(&mut self, metric: &str, values: Vec<f64>) -> Result<()> {
        if self.observations.contains_key(metric) {
            return Err(ExtractError::DuplicateKey(metric.to_string()));
        }
        self.observations.insert(metric.to_string(), values);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.observations
            .iter()
            .map(|(metric, values)| (metric.as_str(), values.as_slice()))
    }

    /// Arithmetic mean per metric. An empty series has no mean; callers
    /// that can tolerate the gap drop the cell instead (see tabulation).
    pub fn means(&self) -> Result<BTreeMap<String, f64>> {
        let mut means = BTreeMap::new();
        for (metric, values) in &self.observations {
            if values.is_empty() {
                return Err(ExtractError::EmptyAccumulator(metric.clone()));
            }
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            means.insert(metric.clone(), mean);
        }
        Ok(means)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_creates_then_extends_series() {
        let mut acc = Accumulator::new();
        acc.append("HestonTotal", 1.0);
        acc.append("HestonTotal", 3.0);

        let (metric, values) = acc.iter().next().unwrap();
        assert_eq!(metric, "HestonTotal");
        assert_eq!(values, [1.0, 3.0]);
    }

    #[test]
    fn means_are_insensitive_to_append_order() {
        let mut forward = Accumulator::new();
        for value in [1.0, 3.0, 2.0] {
            forward.append("t", value);
        }
        let mut shuffled = Accumulator::new();
        for value in [2.0, 1.0, 3.0] {
            shuffled.append("t", value);
        }

        assert_eq!(forward.means().unwrap()["t"], 2.0);
        assert_eq!(forward.means().unwrap(), shuffled.means().unwrap());
    }

    #[test]
    fn merging_a_record_twice_doubles_lengths_but_keeps_means() {
        let record = vec![("a".to_string(), 4.0), ("b".to_string(), 6.0)];

        let mut acc = Accumulator::new();
        acc.merge_record(&record);
        let once = acc.means().unwrap();
        acc.merge_record(&record);
        let twice = acc.means().unwrap();

        assert_eq!(once, twice);
        for (_, values) in acc.iter() {
            assert_eq!(values.len(), 2);
        }
    }

    #[test]
    fn set_once_rejects_existing_keys() {
        let mut acc = Accumulator::new();
        acc.append("Total User", 1.0);

        let err = acc.set_once("Total User", vec![2.0]).unwrap_err();
        assert!(matches!(err, ExtractError::DuplicateKey(k) if k == "Total User"));

        acc.set_once("Total Wall", vec![2.0, 4.0]).unwrap();
        assert_eq!(acc.means().unwrap()["Total Wall"], 3.0);
    }

    #[test]
    fn empty_series_has_no_mean() {
        let mut acc = Accumulator::new();
        acc.set_once("t", Vec::new()).unwrap();
        assert!(matches!(
            acc.means(),
            Err(ExtractError::EmptyAccumulator(k)) if k == "t"
        ));
    }
}
