use super::extract::{flatten_output_text, parse_structured, parse_usage, reasoning_summary};
use super::{
    CompletionInput, CompletionOptions, CompletionOutcome, CompletionProvider, LLMError,
};
use crate::config::OpenAIConfig;
use crate::secrets::{scrub, SecretString};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Client for the OpenAI Responses endpoint
pub struct OpenAIProvider {
    config: OpenAIConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig, api_key: SecretString) -> Self {
        Self {
            config,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Build the request body for one call
    pub fn build_payload(
        &self,
        instructions: &str,
        input: &CompletionInput,
        options: &CompletionOptions,
    ) -> Value {
        let input_value = match input {
            CompletionInput::Text(text) => json!(text),
            CompletionInput::Messages(messages) => Value::Array(
                messages
                    .iter()
                    .map(|m| json!({ "role": m.role.to_string(), "content": m.content }))
                    .collect(),
            ),
        };

        let effort = options
            .reasoning_effort
            .unwrap_or(self.config.reasoning_effort);
        let mut reasoning = json!({ "effort": effort.as_str() });
        if options.include_reasoning_summary {
            reasoning["summary"] = json!("auto");
        }

        let verbosity = options.verbosity.unwrap_or(self.config.verbosity);
        let mut text = json!({ "verbosity": verbosity.as_str() });
        if let Some(schema) = &options.output_schema {
            text["format"] = json!({
                "type": "json_schema",
                "name": schema.name,
                "schema": schema.to_json_schema(),
                "strict": true,
            });
        }

        json!({
            "model": self.config.model,
            "max_output_tokens": options.max_output_tokens.unwrap_or(self.config.max_output_tokens),
            "instructions": instructions,
            "input": input_value,
            "reasoning": reasoning,
            "text": text,
        })
    }

    /// Turn a success body into an outcome
    pub fn parse_response(data: &Value, options: &CompletionOptions) -> CompletionOutcome {
        let raw = flatten_output_text(data);
        let parsed = options
            .output_schema
            .as_ref()
            .and_then(|schema| parse_structured(&raw, schema));

        CompletionOutcome {
            parsed,
            raw,
            usage: parse_usage(data),
            response_id: data.get("id").and_then(Value::as_str).map(String::from),
            reasoning_summary: reasoning_summary(data),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        instructions: &str,
        input: &CompletionInput,
        options: &CompletionOptions,
    ) -> super::Result<CompletionOutcome> {
        if self.api_key.is_empty() {
            return Err(LLMError::Configuration("API key is empty".to_string()));
        }

        let url = format!("{}/responses", self.config.base_url.trim_end_matches('/'));
        let payload = self.build_payload(instructions, input, options);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.unsecure()))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::Provider {
                status,
                body: scrub(&body),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let outcome = Self::parse_response(&data, options);
        tracing::debug!(
            response_id = outcome.response_id.as_deref().unwrap_or("-"),
            total_tokens = outcome.usage.total,
            structured = outcome.parsed.is_some(),
            "Completion received"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::schema::{OutputSchema, SchemaField};
    use crate::llm::{Message, ReasoningEffort, Verbosity};

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new(OpenAIConfig::default(), SecretString::new("sk-test"))
    }

    #[test]
    fn test_payload_defaults() {
        let payload = provider().build_payload(
            "Be brief",
            &CompletionInput::text("memo"),
            &CompletionOptions::default(),
        );

        let defaults = OpenAIConfig::default();
        assert_eq!(payload["model"], defaults.model);
        assert_eq!(payload["instructions"], "Be brief");
        assert_eq!(payload["input"], "memo");
        assert_eq!(payload["max_output_tokens"], defaults.max_output_tokens);
        assert_eq!(payload["reasoning"]["effort"], defaults.reasoning_effort.as_str());
        assert!(payload["reasoning"].get("summary").is_none());
        assert!(payload["text"].get("format").is_none());
    }

    #[test]
    fn test_payload_with_schema_and_overrides() {
        let schema = OutputSchema::new("board_review", vec![SchemaField::text("position", "p")]);
        let options = CompletionOptions::default()
            .with_schema(schema)
            .with_effort(ReasoningEffort::High)
            .with_verbosity(Verbosity::Low)
            .with_reasoning_summary();

        let payload = provider().build_payload(
            "i",
            &CompletionInput::Messages(vec![Message::user("hello")]),
            &options,
        );

        assert_eq!(payload["reasoning"]["effort"], "high");
        assert_eq!(payload["reasoning"]["summary"], "auto");
        assert_eq!(payload["text"]["verbosity"], "low");
        assert_eq!(payload["text"]["format"]["type"], "json_schema");
        assert_eq!(payload["text"]["format"]["name"], "board_review");
        assert_eq!(payload["text"]["format"]["strict"], true);
        assert_eq!(payload["input"][0]["role"], "user");
        assert_eq!(payload["input"][0]["content"], "hello");
    }

    #[test]
    fn test_parse_response_without_usage() {
        let data = json!({"id": "resp_9", "output_text": "plain answer"});
        let outcome = OpenAIProvider::parse_response(&data, &CompletionOptions::default());
        assert_eq!(outcome.raw, "plain answer");
        assert_eq!(outcome.parsed, None);
        assert_eq!(outcome.response_id.as_deref(), Some("resp_9"));
        assert_eq!(outcome.usage.input, 0);
        assert_eq!(outcome.usage.output, 0);
        assert_eq!(outcome.usage.reasoning, 0);
        assert_eq!(outcome.usage.total, 0);
    }

    #[test]
    fn test_parse_response_unparseable_structured_output() {
        let schema = OutputSchema::new("s", vec![SchemaField::text("position", "p")]);
        let options = CompletionOptions::default().with_schema(schema);
        let data = json!({"output_text": "I refuse to answer in JSON."});
        let outcome = OpenAIProvider::parse_response(&data, &options);
        assert_eq!(outcome.parsed, None);
        assert_eq!(outcome.raw, "I refuse to answer in JSON.");
    }
}
