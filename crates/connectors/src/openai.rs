//! OpenAI API client: chat completions with tool calling, structured
//! output, embeddings, and realtime session creation.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use engine::{Embedder, EngineError};

use crate::ConnectorError;

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    realtime_model: String,
}

/// Plain-text answer or a single tool invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum CompletionOutcome {
    Text(String),
    ToolCall { name: String, arguments: Value },
}

/// The finance tool declarations offered to the model.
pub fn finance_tools() -> Vec<Value> {
    vec![
        json!({
            "type": "function",
            "function": {
                "name": "query_transactions",
                "description": "Retrieve user transactions based on a natural language request. \
                    This tool allows users to search for transactions by date, category, amount, \
                    or specific keywords.",
                "parameters": {
                    "type": "object",
                    "required": ["query"],
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "A natural language query specifying the transactions to retrieve."
                        }
                    }
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": "create_visualization",
                "description": "Generate a financial data visualization based on user input. \
                    This tool supports visualizing spending trends, income vs. expenses, and \
                    transaction breakdowns.",
                "parameters": {
                    "type": "object",
                    "required": ["query"],
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "A natural language query describing the financial data to visualize."
                        }
                    }
                }
            }
        }),
    ]
}

/// JSON schema for the categorised follow-up questions.
pub fn suggestion_schema() -> Value {
    json!({
        "type": "object",
        "required": ["categories"],
        "additionalProperties": false,
        "properties": {
            "categories": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "description", "questions"],
                    "additionalProperties": false,
                    "properties": {
                        "name": { "type": "string" },
                        "description": { "type": "string" },
                        "questions": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["id", "question", "relevance", "context"],
                                "additionalProperties": false,
                                "properties": {
                                    "id": { "type": "string" },
                                    "question": { "type": "string" },
                                    "relevance": { "type": "number" },
                                    "context": { "type": "string" }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

impl OpenAiClient {
    pub fn new(
        client: Client,
        base_url: String,
        api_key: String,
        chat_model: String,
        embedding_model: String,
        realtime_model: String,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            chat_model,
            embedding_model,
            realtime_model,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ConnectorError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await?;
        if !status.is_success() {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("openai error")
                .to_string();
            return Err(ConnectorError::Api { status, message });
        }
        Ok(payload)
    }

    /// One completion round with the finance tools attached.
    pub async fn chat_completion(
        &self,
        system_prompt: &str,
        user_message: &str,
        tools: Option<Vec<Value>>,
    ) -> Result<CompletionOutcome, ConnectorError> {
        let mut body = json!({
            "model": self.chat_model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_message },
            ],
        });
        if let Some(tools) = tools {
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = json!("auto");
        }

        let payload = self.post("/v1/chat/completions", &body).await?;
        parse_completion(&payload)
    }

    /// Structured-output completion; returns the parsed JSON object.
    pub async fn structured_completion(
        &self,
        prompt: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<Value, ConnectorError> {
        let body = json!({
            "model": self.chat_model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": schema_name, "strict": true, "schema": schema }
            },
        });

        let payload = self.post("/v1/chat/completions", &body).await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ConnectorError::Decode("missing completion content".to_string()))?;
        serde_json::from_str(content)
            .map_err(|err| ConnectorError::Decode(format!("structured output: {err}")))
    }

    pub async fn create_embedding(&self, text: &str) -> Result<Vec<f32>, ConnectorError> {
        let body = json!({ "model": self.embedding_model, "input": text });
        let payload = self.post("/v1/embeddings", &body).await?;
        let embedding = payload["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| ConnectorError::Decode("missing embedding".to_string()))?;
        embedding
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| ConnectorError::Decode("non-numeric embedding".to_string()))
            })
            .collect()
    }

    /// Creates a realtime voice session and returns the raw descriptor.
    pub async fn create_realtime_session(
        &self,
        voice: &str,
        instructions: &str,
        tools: Vec<Value>,
    ) -> Result<Value, ConnectorError> {
        let body = json!({
            "model": self.realtime_model,
            "voice": voice,
            "instructions": instructions,
            "tools": tools,
        });

        let response = self
            .client
            .post(self.url("/v1/realtime/sessions"))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "realtime-1.0.0")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await?;
        if !status.is_success() || payload.get("error").is_some_and(|e| !e.is_null()) {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("openai error")
                .to_string();
            tracing::error!("realtime session creation failed: {message}");
            return Err(ConnectorError::Api { status, message });
        }
        Ok(payload)
    }
}

/// Extracts the first tool call, or the text content when there is none.
pub(crate) fn parse_completion(payload: &Value) -> Result<CompletionOutcome, ConnectorError> {
    let message = &payload["choices"][0]["message"];

    if let Some(call) = message["tool_calls"].as_array().and_then(|c| c.first()) {
        let name = call["function"]["name"]
            .as_str()
            .ok_or_else(|| ConnectorError::Decode("tool call without a name".to_string()))?
            .to_string();
        let raw_arguments = call["function"]["arguments"].as_str().unwrap_or("{}");
        let arguments = serde_json::from_str(raw_arguments)
            .map_err(|err| ConnectorError::Decode(format!("tool arguments: {err}")))?;
        return Ok(CompletionOutcome::ToolCall { name, arguments });
    }

    let content = message["content"].as_str().unwrap_or_default().to_string();
    Ok(CompletionOutcome::Text(content))
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        self.create_embedding(text).await.map_err(|err| {
            tracing::error!("embedding request failed: {err}");
            EngineError::from(err)
        })
    }
}
