#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ContentPart {
    Text(String),
    /// Encoded JPEG bytes; adapters decide how to ship them.
    JpegImage(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub parts: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user_with_image(text: impl Into<String>, jpeg: Vec<u8>) -> Self {
        Self {
            role: ChatRole::User,
            parts: vec![ContentPart::Text(text.into()), ContentPart::JpegImage(jpeg)],
        }
    }

    pub fn has_image(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, ContentPart::JpegImage(_)))
    }
}

/// A function the model may call.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// Which configured model a request should be routed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelHint {
    #[default]
    Text,
    Vision,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub temperature: Option<f32>,
    pub model_hint: ModelHint,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

/// An LLM/VLM endpoint.
///
/// The scorers only rely on `content` being recoverable as JSON; tool calls
/// are carried for callers that drive the provider conversationally.
pub trait ChatProvider: Send + Sync {
    fn chat(
        &self,
        request: &ChatRequest,
    ) -> Result<ChatResponse, Box<dyn std::error::Error + Send + Sync>>;

    /// Cheap reachability probe. Never errors; an unreachable provider is `false`.
    fn is_available(&self) -> bool;
}
