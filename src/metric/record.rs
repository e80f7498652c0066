//! Metric Records - series of `(key, value)` points and their metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::MetricScope;
use crate::document::Document;
use crate::{Error, Result};

/// X-axis key of a metric point.
///
/// Components emit integer steps, float thresholds (ROC/KS curves) or string
/// labels (confusion-matrix cells). Integers above `i64::MAX` keep their exact
/// value as `UInt` rather than degrading to a float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricKey {
    /// Integer step or epoch
    Int(i64),
    /// Unsigned integer key beyond the `i64` range
    UInt(u64),
    /// Floating point key
    Float(f64),
    /// Label
    Text(String),
}

impl From<i64> for MetricKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for MetricKey {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for MetricKey {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::UInt(value), Self::Int)
    }
}

impl From<f64> for MetricKey {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for MetricKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One point of a metric series. A `None` value is an explicit gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    key: MetricKey,
    value: Option<f64>,
}

impl MetricPoint {
    /// Create a point with a value.
    #[must_use]
    pub fn new(key: impl Into<MetricKey>, value: f64) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
        }
    }

    /// Create a point with a null value.
    #[must_use]
    pub fn null(key: impl Into<MetricKey>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// Parse a wire point: a `[key, value]` pair, or `{"key": .., "value": ..}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetricPoint`] when the shape is wrong, the key
    /// is neither number nor string, or the value is neither number nor null.
    pub fn from_json(index: usize, raw: &Value) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidMetricPoint { index, reason };

        let (key, value) = match raw {
            Value::Array(pair) if pair.len() == 2 => (&pair[0], &pair[1]),
            Value::Object(map) => match (map.get("key"), map.get("value")) {
                (Some(key), Some(value)) => (key, value),
                _ => return Err(invalid("object point needs 'key' and 'value'".into())),
            },
            _ => return Err(invalid("expected a [key, value] pair".into())),
        };

        let key = match key {
            Value::Number(n) => n
                .as_i64()
                .map(MetricKey::Int)
                .or_else(|| n.as_u64().map(MetricKey::UInt))
                .or_else(|| n.as_f64().map(MetricKey::Float))
                .ok_or_else(|| invalid(format!("key {n} is not representable")))?,
            Value::String(s) => MetricKey::Text(s.clone()),
            other => return Err(invalid(format!("key must be a number or string, got {other}"))),
        };

        let value = match value {
            Value::Null => None,
            Value::Number(n) => Some(
                n.as_f64()
                    .ok_or_else(|| invalid(format!("value {n} is not representable")))?,
            ),
            other => return Err(invalid(format!("value must be numeric or null, got {other}"))),
        };

        Ok(Self { key, value })
    }

    /// Get the x-axis key.
    #[must_use]
    pub const fn key(&self) -> &MetricKey {
        &self.key
    }

    /// Get the value, `None` for a null point.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        self.value
    }
}

/// A complete metric series as last submitted.
///
/// Points keep submission order; it is the display order and is never
/// re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    scope: MetricScope,
    namespace: String,
    name: String,
    points: Vec<MetricPoint>,
    updated_at: DateTime<Utc>,
}

impl MetricSeries {
    /// Create a series stamped with the current time.
    #[must_use]
    pub fn new(
        scope: MetricScope,
        namespace: impl Into<String>,
        name: impl Into<String>,
        points: Vec<MetricPoint>,
    ) -> Self {
        Self {
            scope,
            namespace: namespace.into(),
            name: name.into(),
            points,
            updated_at: Utc::now(),
        }
    }

    /// Get the scope.
    #[must_use]
    pub const fn scope(&self) -> &MetricScope {
        &self.scope
    }

    /// Get the metric namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the points in submission order.
    #[must_use]
    pub fn points(&self) -> &[MetricPoint] {
        &self.points
    }

    /// Get the time of the last effective write.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Descriptive metadata for a metric (units, chart hints, extra fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMeta {
    scope: MetricScope,
    namespace: String,
    name: String,
    meta: Document,
    updated_at: DateTime<Utc>,
}

impl MetricMeta {
    /// Create a metadata record stamped with the current time.
    #[must_use]
    pub fn new(
        scope: MetricScope,
        namespace: impl Into<String>,
        name: impl Into<String>,
        meta: Document,
    ) -> Self {
        Self {
            scope,
            namespace: namespace.into(),
            name: name.into(),
            meta,
            updated_at: Utc::now(),
        }
    }

    /// Get the scope.
    #[must_use]
    pub const fn scope(&self) -> &MetricScope {
        &self.scope
    }

    /// Get the metric namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the metadata document.
    #[must_use]
    pub const fn meta(&self) -> &Document {
        &self.meta
    }
}

/// Read result: one metric's points joined with its metadata.
///
/// Either half may be missing since data and meta are written independently.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricEntry {
    /// Metric namespace
    pub namespace: String,
    /// Metric name
    pub name: String,
    /// Points in submission order, empty if only metadata was written
    pub points: Vec<MetricPoint>,
    /// Metadata, if written
    pub meta: Option<Document>,
}
