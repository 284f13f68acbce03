use std::{collections::BTreeMap, sync::RwLock};

use crate::{
    error::{MetricError, RenderError},
    metric::{RenderMetric, labels},
};

/// Monotonically increasing event counter, optionally split by labels.
#[derive(Debug)]
pub struct CounterMetric {
    name: String,
    labels: Vec<String>,
    counts: RwLock<BTreeMap<Vec<String>, u64>>,
}

impl CounterMetric {
    /// Create a counter with the given fully-qualified name and label names.
    pub fn new(name: impl Into<String>, label_names: &[&str]) -> Result<Self, MetricError> {
        let name = name.into();
        let labels = labels::validate(&name, label_names)?;

        Ok(Self {
            name,
            labels,
            counts: RwLock::new(BTreeMap::new()),
        })
    }

    /// Increment by one for the given label values.
    #[inline]
    pub fn inc(&self, values: &[&str]) -> Result<(), MetricError> {
        self.inc_by(1, values)
    }

    /// Increment by `n` for the given label values.
    pub fn inc_by(&self, n: u64, values: &[&str]) -> Result<(), MetricError> {
        let key = labels::label_key(&self.name, &self.labels, values)?;
        let mut counts = self
            .counts
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = counts.entry(key).or_insert(0);
        *slot = slot.saturating_add(n);
        Ok(())
    }

    /// Current value for the given label values (0 if never incremented).
    pub fn get(&self, values: &[&str]) -> Result<u64, MetricError> {
        let key = labels::label_key(&self.name, &self.labels, values)?;
        let counts = self
            .counts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(counts.get(&key).copied().unwrap_or(0))
    }
}

impl RenderMetric for CounterMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> Result<Vec<String>, RenderError> {
        let counts = self
            .counts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.labels.is_empty() {
            let value = counts.get(&Vec::new()).copied().unwrap_or(0);
            return Ok(vec![format!("{} {}", self.name, value)]);
        }

        counts
            .iter()
            .map(|(values, count)| {
                let block = labels::format_labels(&self.labels, values)?;
                Ok(format!("{}{} {}", self.name, block, count))
            })
            .collect()
    }
}
