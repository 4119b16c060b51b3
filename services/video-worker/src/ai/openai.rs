use super::AnalysisClient;
use crate::error::{PipelineError, PipelineResult};
use crate::models::AiResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

const HEALTH_PROMPT: &str = "You analyze plant health from photos. Look at the attached plant \
photo and identify any diseases, pests or nutrient problems. Give step-by-step treatment \
instructions, name specific products to buy if any are needed, and estimate how long recovery \
should take. If the plant is healthy, say so and skip the recovery timeline.";

const GROWTH_PROMPT: &str = "You measure plant growth from photos. From the attached image report:\n\
1. Leaf Count: the number of visible leaves.\n\
2. Plant Height: the height in centimeters, if a reference scale is visible.\n\
Present the results in a clear, structured format.";

/// Chat-completions client for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Analysis(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            temperature,
        })
    }

    async fn complete(&self, content: serde_json::Value, purpose: &str) -> PipelineResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Analysis(format!("{} request failed: {}", purpose, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("AI endpoint error ({}): status={} body={}", purpose, status, body);
            return Err(PipelineError::Analysis(format!(
                "{} returned {}",
                purpose, status
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Analysis(format!("{} response unreadable: {}", purpose, e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PipelineError::Analysis(format!("{} response had no content", purpose)))?;

        info!("{} response received ({} chars)", purpose, content.len());
        Ok(content)
    }

    fn image_content(prompt: &str, image_url: &str) -> serde_json::Value {
        json!([
            { "type": "text", "text": prompt },
            { "type": "image_url", "image_url": { "url": image_url, "detail": "high" } }
        ])
    }
}

#[async_trait]
impl AnalysisClient for OpenAiClient {
    async fn analyze_image(&self, image_url: &str) -> PipelineResult<AiResult> {
        let health = self
            .complete(Self::image_content(HEALTH_PROMPT, image_url), "health analysis")
            .await?;
        let growth = self
            .complete(Self::image_content(GROWTH_PROMPT, image_url), "growth analysis")
            .await?;

        Ok(AiResult {
            health_analysis: Some(health),
            growth_analysis: Some(growth),
        })
    }

    async fn summarize(&self, prompt: &str) -> PipelineResult<String> {
        self.complete(json!(prompt), "aggregate analysis").await
    }
}
