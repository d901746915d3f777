//! services/admin/src/adapters/segmentation_llm.rs
//!
//! This module contains the adapter for the paragraph-segmenting LLM.
//! It implements the `ParagraphSegmentationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, FinishReason},
    Client,
};
use async_trait::async_trait;
use bookbyte_core::{
    ports::{ParagraphSegmentationService, PortError, PortResult},
    segmentation::{build_segmentation_prompt, parse_paragraphs_response},
};
use tracing::{debug, info};

/// Upper bound on the completion; whole books produce very long replies.
const MAX_COMPLETION_TOKENS: u32 = 100_000;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ParagraphSegmentationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiSegmentationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSegmentationAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `ParagraphSegmentationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ParagraphSegmentationService for OpenAiSegmentationAdapter {
    /// Sends the whole cleaned text in one user message and parses the JSON reply.
    async fn segment(&self, text: &str) -> PortResult<Vec<String>> {
        info!(
            model = %self.model,
            characters = text.len(),
            "Sending book text for segmentation"
        );

        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(build_segmentation_prompt(text))
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(MAX_COMPLETION_TOKENS)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            PortError::Unexpected("Segmentation LLM returned no choices in its response.".to_string())
        })?;
        debug!(finish_reason = ?choice.finish_reason, "Segmentation reply received");

        if choice.finish_reason == Some(FinishReason::Length) {
            return Err(PortError::Unexpected(
                "Segmentation response was truncated due to token limit. Try a shorter book."
                    .to_string(),
            ));
        }

        let content = choice.message.content.unwrap_or_default();
        let paragraphs = parse_paragraphs_response(&content)
            .map_err(|e| PortError::InvalidInput(e.to_string()))?;
        info!(paragraphs = paragraphs.len(), "Book segmented");
        Ok(paragraphs)
    }
}
