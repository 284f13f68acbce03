use std::fmt;

use crate::{
    error::{MetricError, RenderError},
    metric::{RenderMetric, format_value, labels},
};

/// Value produced by a [`CallbackMetric`] at render time.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackValue {
    /// Single unlabelled value.
    Scalar(f64),
    /// One value per label-value tuple.
    Labelled(Vec<(Vec<String>, f64)>),
}

impl From<f64> for CallbackValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<u64> for CallbackValue {
    fn from(v: u64) -> Self {
        Self::Scalar(v as f64)
    }
}

/// Boxed callback evaluated on every render.
pub type Callback = Box<dyn Fn() -> Result<CallbackValue, RenderError> + Send + Sync>;

/// Point-in-time value computed by a callback whenever the metric is rendered.
pub struct CallbackMetric {
    name: String,
    labels: Vec<String>,
    callback: Callback,
}

impl CallbackMetric {
    /// Create a callback metric with the given fully-qualified name, label names and callback.
    pub fn new<F>(name: impl Into<String>, label_names: &[&str], callback: F) -> Result<Self, MetricError>
    where
        F: Fn() -> Result<CallbackValue, RenderError> + Send + Sync + 'static,
    {
        let name = name.into();
        let labels = labels::validate(&name, label_names)?;

        Ok(Self {
            name,
            labels,
            callback: Box::new(callback),
        })
    }

    /// Evaluate the callback without formatting.
    pub fn value(&self) -> Result<CallbackValue, RenderError> {
        (self.callback)()
    }
}

impl RenderMetric for CallbackMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> Result<Vec<String>, RenderError> {
        match self.value()? {
            CallbackValue::Scalar(v) => {
                if !self.labels.is_empty() {
                    return Err(RenderError::LabelArity {
                        expected: self.labels.len(),
                        actual: 0,
                    });
                }
                Ok(vec![format!("{} {}", self.name, format_value(v))])
            }
            CallbackValue::Labelled(mut rows) => {
                rows.sort_by(|a, b| a.0.cmp(&b.0));
                rows.iter()
                    .map(|(values, v)| {
                        let block = labels::format_labels(&self.labels, values)?;
                        Ok(format!("{}{} {}", self.name, block, format_value(*v)))
                    })
                    .collect()
            }
        }
    }
}

impl fmt::Debug for CallbackMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackMetric")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .field("callback", &"<fn>")
            .finish()
    }
}
