//! AI analysis client and result aggregation

use crate::error::PipelineResult;
use crate::models::AiResult;
use async_trait::async_trait;

pub mod aggregator;
pub mod openai;

pub use aggregator::AiResultAggregator;
pub use openai::OpenAiClient;

/// Multimodal completion endpoint, treated as a free-text black box.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Health and growth analysis of the image behind `image_url`.
    async fn analyze_image(&self, image_url: &str) -> PipelineResult<AiResult>;

    /// Send a text-only prompt and return the model's reply.
    async fn summarize(&self, prompt: &str) -> PipelineResult<String>;
}
