//! Gemini `generateContent` client
//!
//! Sends the photo inline with a prompt and a JSON response schema, then
//! parses the first candidate's text as the structured result.

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;
use ww_common::config::ClassifierConfig;
use ww_common::image::DataUri;

use super::{CircuitAnalysis, ClassifyError, Classifier, WasteIdentification};

const WASTE_PROMPT: &str = "You are an AI assistant specialized in identifying the type of waste \
in a given image. Analyze the image and determine the waste type. Waste types can be plastic, \
paper, glass, organic, or other. Return the waste type and a confidence score (0-1) indicating \
the accuracy of the identification.";

const CIRCUIT_PROMPT: &str = "You are an expert electronics engineer. Analyze the provided image \
of a printed circuit board. Identify all significant electronic components visible in the image. \
For each component provide its common name (e.g. CPU, Capacitor, Resistor, Inductor, Crystal \
Oscillator), a brief one-sentence description of its primary function, and a bounding box whose \
x, y, width and height are percentages (0-100) of the image dimensions, with x and y the top-left \
corner.";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

pub struct GeminiClassifier {
    api_key: String,
    model: String,
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl GeminiClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifyError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ClassifyError::Config("API key is not set".to_string()))?;
        let per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
            ClassifyError::Config("requests_per_minute must be positive".to_string())
        })?;
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifyError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout,
            client,
            rate_limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        prompt: &str,
        photo: &DataUri,
        schema: Value,
    ) -> Result<T, ClassifyError> {
        tokio::time::timeout(self.timeout, self.rate_limiter.until_ready())
            .await
            .map_err(|_| ClassifyError::RateLimited)?;

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inlineData": { "mimeType": photo.mime_type(), "data": photo.base64_data() } }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });

        debug!(model = %self.model, mime_type = photo.mime_type(), "Classification request");
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Api(status.as_u16(), text));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::Parse(e.to_string()))?;
        let text = candidate_text(parsed)?;
        serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| ClassifyError::Parse(format!("{}: {}", e, text)))
    }
}

fn candidate_text(response: GenerateResponse) -> Result<String, ClassifyError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ClassifyError::Parse("response has no candidate text".to_string()));
    }
    Ok(text)
}

/// Models sometimes wrap JSON output in a markdown fence
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

fn waste_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "wasteType": { "type": "STRING" },
            "confidence": { "type": "NUMBER" }
        },
        "required": ["wasteType", "confidence"]
    })
}

fn circuit_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "components": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "componentName": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "boundingBox": {
                            "type": "OBJECT",
                            "properties": {
                                "x": { "type": "NUMBER" },
                                "y": { "type": "NUMBER" },
                                "width": { "type": "NUMBER" },
                                "height": { "type": "NUMBER" }
                            },
                            "required": ["x", "y", "width", "height"]
                        }
                    },
                    "required": ["componentName", "description", "boundingBox"]
                }
            }
        },
        "required": ["components"]
    })
}

#[async_trait]
impl Classifier for GeminiClassifier {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn identify_waste(&self, photo: &DataUri) -> Result<WasteIdentification, ClassifyError> {
        let result: WasteIdentification = self.generate(WASTE_PROMPT, photo, waste_schema()).await?;
        result.validate()?;
        Ok(result)
    }

    async fn analyze_circuit_board(
        &self,
        photo: &DataUri,
    ) -> Result<CircuitAnalysis, ClassifyError> {
        let result: CircuitAnalysis =
            self.generate(CIRCUIT_PROMPT, photo, circuit_schema()).await?;
        result.validate()?;
        Ok(result)
    }
}
