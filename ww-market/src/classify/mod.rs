//! Image classification collaborators
//!
//! Two operations are delegated to a hosted multimodal model: naming the
//! waste type in a photo, and locating components on a circuit board.
//! Output that is out of range is rejected here rather than shown.

mod gemini;

pub use gemini::GeminiClassifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ww_common::image::DataUri;

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the model endpoint
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response body was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Parsed output violates its documented ranges
    #[error("Malformed classification output: {0}")]
    Malformed(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Classifier configuration error: {0}")]
    Config(String),
}

/// Waste identification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteIdentification {
    pub waste_type: String,
    /// In [0, 1]
    #[serde(alias = "confidenceScore")]
    pub confidence: f64,
}

impl WasteIdentification {
    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.waste_type.trim().is_empty() {
            return Err(ClassifyError::Malformed("empty waste type".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ClassifyError::Malformed(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Component location as percentages of the image size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    fn validate(&self) -> Result<(), ClassifyError> {
        for (name, value) in [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ClassifyError::Malformed(format!(
                    "bounding box {} = {} outside 0-100",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitComponent {
    pub component_name: String,
    pub description: String,
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitAnalysis {
    pub components: Vec<CircuitComponent>,
}

impl CircuitAnalysis {
    pub fn validate(&self) -> Result<(), ClassifyError> {
        for component in &self.components {
            if component.component_name.trim().is_empty() {
                return Err(ClassifyError::Malformed(
                    "component without a name".to_string(),
                ));
            }
            component.bounding_box.validate()?;
        }
        Ok(())
    }
}

/// Hosted image classifier
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    async fn identify_waste(&self, photo: &DataUri) -> Result<WasteIdentification, ClassifyError>;

    async fn analyze_circuit_board(&self, photo: &DataUri)
        -> Result<CircuitAnalysis, ClassifyError>;
}
