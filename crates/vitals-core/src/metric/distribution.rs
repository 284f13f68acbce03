use std::{collections::BTreeMap, sync::RwLock};

use crate::{
    error::{MetricError, RenderError},
    metric::{RenderMetric, labels},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Totals {
    count: u64,
    total: u64,
}

/// Running count and sum of observed samples, optionally split by labels.
///
/// Rendered as two series, `<name>:count` and `<name>:total`.
#[derive(Debug)]
pub struct DistributionMetric {
    name: String,
    labels: Vec<String>,
    totals: RwLock<BTreeMap<Vec<String>, Totals>>,
}

impl DistributionMetric {
    /// Create a distribution with the given fully-qualified name and label names.
    pub fn new(name: impl Into<String>, label_names: &[&str]) -> Result<Self, MetricError> {
        let name = name.into();
        let labels = labels::validate(&name, label_names)?;

        Ok(Self {
            name,
            labels,
            totals: RwLock::new(BTreeMap::new()),
        })
    }

    /// Record one sample of size `sample` for the given label values.
    pub fn inc_by(&self, sample: u64, values: &[&str]) -> Result<(), MetricError> {
        let key = labels::label_key(&self.name, &self.labels, values)?;
        let mut totals = self
            .totals
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = totals.entry(key).or_default();
        slot.count = slot.count.saturating_add(1);
        slot.total = slot.total.saturating_add(sample);
        Ok(())
    }

    /// Returns `(count, total)` for the given label values.
    pub fn get(&self, values: &[&str]) -> Result<(u64, u64), MetricError> {
        let key = labels::label_key(&self.name, &self.labels, values)?;
        let totals = self
            .totals
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(totals
            .get(&key)
            .map(|t| (t.count, t.total))
            .unwrap_or((0, 0)))
    }
}

impl RenderMetric for DistributionMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> Result<Vec<String>, RenderError> {
        let totals = self
            .totals
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.labels.is_empty() {
            let t = totals.get(&Vec::new()).copied().unwrap_or_default();
            return Ok(vec![
                format!("{}:count {}", self.name, t.count),
                format!("{}:total {}", self.name, t.total),
            ]);
        }

        let mut lines = Vec::with_capacity(totals.len() * 2);
        for (values, t) in totals.iter() {
            let block = labels::format_labels(&self.labels, values)?;
            lines.push(format!("{}:count{} {}", self.name, block, t.count));
            lines.push(format!("{}:total{} {}", self.name, block, t.total));
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlabelled_distribution_renders_zeroes() {
        let d = DistributionMetric::new("request_time", &[]).unwrap();
        assert_eq!(
            d.render().unwrap(),
            vec!["request_time:count 0", "request_time:total 0"]
        );
    }

    #[test]
    fn tracks_count_and_total() {
        let d = DistributionMetric::new("request_time", &[]).unwrap();
        d.inc_by(120, &[]).unwrap();
        d.inc_by(30, &[]).unwrap();

        assert_eq!(d.get(&[]).unwrap(), (2, 150));
        assert_eq!(
            d.render().unwrap(),
            vec!["request_time:count 2", "request_time:total 150"]
        );
    }

    #[test]
    fn labelled_series_keep_count_and_total_adjacent() {
        let d = DistributionMetric::new("request_time", &["servlet"]).unwrap();
        d.inc_by(5, &["sync"]).unwrap();
        d.inc_by(1, &["login"]).unwrap();

        assert_eq!(
            d.render().unwrap(),
            vec![
                r#"request_time:count{servlet="login"} 1"#,
                r#"request_time:total{servlet="login"} 1"#,
                r#"request_time:count{servlet="sync"} 1"#,
                r#"request_time:total{servlet="sync"} 5"#,
            ]
        );
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let d = DistributionMetric::new("request_time", &["servlet"]).unwrap();
        assert!(d.inc_by(1, &["a", "b"]).is_err());
        assert_eq!(d.get(&["a"]).unwrap(), (0, 0));
        assert!(matches!(
            d.get(&[]),
            Err(MetricError::LabelArity { expected: 1, actual: 0, .. })
        ));
    }

    #[test]
    fn samples_survive_a_poisoned_lock() {
        let d = std::sync::Arc::new(DistributionMetric::new("request_time", &[]).unwrap());

        let held = d.clone();
        let _ = std::thread::spawn(move || {
            let _guard = held.totals.write().unwrap();
            panic!("poison the distribution lock");
        })
        .join();
        assert!(d.totals.is_poisoned());

        d.inc_by(7, &[]).unwrap();
        assert_eq!(d.get(&[]).unwrap(), (1, 7));
    }
}
