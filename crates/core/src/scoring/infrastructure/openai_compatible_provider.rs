use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::scoring::domain::chat_provider::{
    ChatMessage, ChatProvider, ChatRequest, ChatResponse, ContentPart, ModelHint, ToolCall,
};
use crate::shared::settings::ProviderSettings;

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Chat provider for any server exposing the OpenAI `/chat/completions` API
/// (OpenAI, Ollama, LM Studio, vLLM, ...).
pub struct OpenAiCompatibleProvider {
    client: Client,
    probe_client: Client,
    base_url: String,
    model: String,
    vision_model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        let probe_client = Client::builder()
            .timeout(Duration::from_secs(settings.availability_timeout_secs))
            .build()?;
        let api_key = settings
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            client,
            probe_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            vision_model: settings.vision_model.clone(),
            api_key,
        })
    }

    fn model_for(&self, hint: ModelHint) -> &str {
        match hint {
            ModelHint::Vision if !self.vision_model.is_empty() => &self.vision_model,
            _ => &self.model,
        }
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.model_for(request.model_hint),
            "messages": request.messages.iter().map(message_json).collect::<Vec<_>>(),
            "stream": false,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
        }
        body
    }

    fn authorized(
        &self,
        builder: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

fn message_json(message: &ChatMessage) -> Value {
    let content = match message.parts.as_slice() {
        [ContentPart::Text(text)] => json!(text),
        parts => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({ "type": "text", "text": text }),
                ContentPart::JpegImage(bytes) => json!({
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:image/jpeg;base64,{}", BASE64.encode(bytes)),
                    }
                }),
            })
            .collect(),
    };
    json!({ "role": message.role.as_str(), "content": content })
}

fn into_chat_response(response: CompletionResponse) -> Result<ChatResponse, String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or("completion response had no choices")?;
    Ok(ChatResponse {
        content: choice.message.content,
        tool_calls: choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect(),
        finish_reason: choice.finish_reason,
    })
}

impl ChatProvider for OpenAiCompatibleProvider {
    fn chat(
        &self,
        request: &ChatRequest,
    ) -> Result<ChatResponse, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .json(&self.request_body(request))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(format!("provider returned {status}: {body}").into());
        }
        let completion: CompletionResponse = response.json()?;
        Ok(into_chat_response(completion)?)
    }

    fn is_available(&self) -> bool {
        let url = format!("{}/models", self.base_url);
        match self.authorized(self.probe_client.get(&url)).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("Provider at {} unavailable: {e}", self.base_url);
                false
            }
        }
    }
}
