//! services/api/src/adapters/quote_llm.rs
//!
//! This module contains the adapter for the quote-generating LLM.
//! It implements the `QuoteGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use quote_feed_core::ports::{
    GenerationRequest, PortError, PortResult, QuoteGenerationService,
};
use serde_json::{json, Value};
use tracing::debug;

const SYSTEM_INSTRUCTIONS: &str = "You are a curator of philosophical quotes from every culture and era. Only return real, attributable quotes. Answer strictly in the requested JSON format.";

/// The JSON schema the model must follow. Strict mode needs an object at the root,
/// so the array of quotes sits under `quotes`.
fn batch_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "quotes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "quote": { "type": "string", "description": "The quote in its original language." },
                        "author": { "type": "string", "description": "The author's name in their native script." },
                        "translation": { "type": "string", "description": "A Chinese translation of the quote." },
                        "source": { "type": ["string", "null"], "description": "The book, speech, etc. the quote comes from, if known." }
                    },
                    "required": ["quote", "author", "translation", "source"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["quotes"],
        "additionalProperties": false
    })
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuoteGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiQuoteAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiQuoteAdapter {
    /// Creates a new `OpenAiQuoteAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `QuoteGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuoteGenerationService for OpenAiQuoteAdapter {
    /// Asks the model for a batch of quotes and returns the JSON text unvalidated.
    async fn generate_quotes(&self, request: &GenerationRequest) -> PortResult<String> {
        debug!("Requesting {} quotes from {}", request.count, self.model);

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: Some("A batch of philosophical quotes.".to_string()),
                name: "quote_batch".to_string(),
                schema: Some(batch_schema()),
                strict: Some(true),
            },
        };

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(response_format)
            .temperature(1.0)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e: OpenAIError| PortError::Unavailable(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Quote LLM response contained no text content.".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_the_quote_fields() {
        let schema = batch_schema();
        let required = &schema["properties"]["quotes"]["items"]["required"];
        for field in ["quote", "author", "translation"] {
            assert!(required.as_array().unwrap().iter().any(|v| v == field));
        }
        assert_eq!(schema["required"][0], "quotes");
    }
}
