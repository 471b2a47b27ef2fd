//! The prediction contract shared with the inference collaborator.
//!
//! Payloads arrive as untyped JSON. `PredictionResult::from_payload` is the one
//! place that decides whether a payload is well formed; everything that fails it is
//! replaced by the canonical zero result before it reaches the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A recognized label and its confidence, as delivered to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    #[serde(rename = "prediction")]
    pub label: String,
    /// In `[0, 1]`.
    pub confidence: f32,
    /// Overall model accuracy in `[0, 1]`, when the service reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,
    #[serde(rename = "probabilities", default)]
    pub per_class_probabilities: BTreeMap<String, f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_time_ms: Option<u64>,
}

/// Why a payload was rejected.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload does not match the prediction shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Wire shape of the inference service's response.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePrediction {
    prediction: String,
    confidence: f64,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    probabilities: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    inference_time_ms: Option<u64>,
}

impl PredictionResult {
    /// The canonical "no signal" result: empty label, zero confidence, no extras.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self == &Self::zero()
    }

    /// Validates a raw payload against the prediction contract.
    pub fn from_payload(payload: &Value) -> Result<Self, PayloadError> {
        let wire = WirePrediction::deserialize(payload)?;

        check_unit_interval("confidence", wire.confidence)?;
        if let Some(accuracy) = wire.accuracy {
            check_unit_interval("accuracy", accuracy)?;
        }

        let mut per_class_probabilities = BTreeMap::new();
        for (label, probability) in wire.probabilities.unwrap_or_default() {
            if !probability.is_finite() {
                return Err(PayloadError::OutOfRange {
                    field: "probabilities",
                    value: probability,
                });
            }
            per_class_probabilities.insert(label, probability as f32);
        }

        Ok(Self {
            label: wire.prediction,
            confidence: wire.confidence as f32,
            accuracy: wire.accuracy.map(|a| a as f32),
            per_class_probabilities,
            inference_time_ms: wire.inference_time_ms,
        })
    }
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<(), PayloadError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PayloadError::OutOfRange { field, value })
    }
}
