//! Name validation and label formatting shared by all metric variants.
use std::fmt::Write;

use crate::error::{MetricError, RenderError};

/// Returns `true` if `name` is a valid exposition metric name (`[a-zA-Z_:][a-zA-Z0-9_:]*`).
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Returns `true` if `name` is a valid label name (`[a-zA-Z_][a-zA-Z0-9_]*`).
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates a metric name together with its declared label names.
///
/// Returns the owned label names on success.
pub fn validate(metric: &str, labels: &[&str]) -> Result<Vec<String>, MetricError> {
    if !is_valid_metric_name(metric) {
        return Err(MetricError::InvalidName(metric.to_string()));
    }

    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for &label in labels {
        if !is_valid_label_name(label) {
            return Err(MetricError::InvalidLabelName {
                metric: metric.to_string(),
                label: label.to_string(),
            });
        }
        if out.iter().any(|l| l == label) {
            return Err(MetricError::DuplicateLabel {
                metric: metric.to_string(),
                label: label.to_string(),
            });
        }
        out.push(label.to_string());
    }
    Ok(out)
}

/// Checks that `values` matches the declared label arity and returns an owned key.
pub fn label_key(metric: &str, names: &[String], values: &[&str]) -> Result<Vec<String>, MetricError> {
    if names.len() != values.len() {
        return Err(MetricError::LabelArity {
            metric: metric.to_string(),
            expected: names.len(),
            actual: values.len(),
        });
    }
    Ok(values.iter().map(|v| v.to_string()).collect())
}

/// Renders a `{a="x",b="y"}` label block; empty when there are no labels.
pub fn format_labels(names: &[String], values: &[String]) -> Result<String, RenderError> {
    if names.len() != values.len() {
        return Err(RenderError::LabelArity {
            expected: names.len(),
            actual: values.len(),
        });
    }
    if names.is_empty() {
        return Ok(String::new());
    }

    let mut out = String::from("{");
    for (i, (name, value)) in names.iter().zip(values).enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}=\"{}\"", name, escape_label_value(value));
    }
    out.push('}');
    Ok(out)
}

fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}
