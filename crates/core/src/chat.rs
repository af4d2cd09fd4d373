//! Chat messages and tool definitions recorded on chat-model spans
//!
//! Both are stored as span attributes in their JSON form:
//! - `chat.messages`: array of [`ChatMessage`]
//! - `chat.tools`: array of [`ChatTool`]
//!
//! Parsing is strict. Unknown fields and unsupported tool types are rejected
//! with `InvalidArgument`, so a malformed payload never reaches storage.

use crate::error::{Error, Result};
use crate::span::Span;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Attribute holding the conversation of a chat-model span
pub const CHAT_MESSAGES_ATTRIBUTE: &str = "chat.messages";

/// Attribute holding the tools offered to a chat-model span
pub const CHAT_TOOLS_ATTRIBUTE: &str = "chat.tools";

/// One message of a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatMessage {
    /// `system`, `user`, `assistant` or `tool`
    pub role: String,
    /// Message text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Author name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Call answered by a tool message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Plain text message
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Tool kinds a model may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    /// A function with JSON arguments
    Function,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCall {
    /// Call id, echoed by the answering tool message
    pub id: String,
    /// Always `function`
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    /// Function and its arguments
    pub function: FunctionCall,
}

/// Function name and JSON-encoded arguments of a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionCall {
    /// Function to call
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

/// A tool offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatTool {
    /// Always `function`
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    /// Function definition
    pub function: FunctionDefinition,
}

/// Name, description and JSON-schema parameters of a tool function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// What the function does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

fn parse_list<T: DeserializeOwned>(kind: &str, value: &serde_json::Value) -> Result<Vec<T>> {
    serde_json::from_value(value.clone())
        .map_err(|e| Error::invalid_argument(format!("invalid {}: {}", kind, e)))
}

/// Parse a JSON array of chat messages
pub fn parse_chat_messages(value: &serde_json::Value) -> Result<Vec<ChatMessage>> {
    parse_list("chat message", value)
}

/// Parse a JSON array of chat tools
pub fn parse_chat_tools(value: &serde_json::Value) -> Result<Vec<ChatTool>> {
    parse_list("chat tool", value)
}

fn to_attribute<T: Serialize>(items: &[T]) -> Result<serde_json::Value> {
    serde_json::to_value(items).map_err(|e| Error::invalid_argument(e.to_string()))
}

impl Span {
    /// Record chat messages, appending to or replacing any already present
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when appending to a `chat.messages` attribute that
    /// does not hold valid messages.
    pub fn set_chat_messages(&mut self, messages: &[ChatMessage], append: bool) -> Result<()> {
        let mut all = match (append, self.attributes.get(CHAT_MESSAGES_ATTRIBUTE)) {
            (true, Some(existing)) => parse_chat_messages(existing)?,
            _ => Vec::new(),
        };
        all.extend_from_slice(messages);
        let value = to_attribute(&all)?;
        self.attributes.insert(CHAT_MESSAGES_ATTRIBUTE.to_string(), value);
        Ok(())
    }

    /// Record the tools offered to the model, replacing any already present
    pub fn set_chat_tools(&mut self, tools: &[ChatTool]) -> Result<()> {
        let value = to_attribute(tools)?;
        self.attributes.insert(CHAT_TOOLS_ATTRIBUTE.to_string(), value);
        Ok(())
    }

    /// Chat messages recorded on this span
    pub fn chat_messages(&self) -> Result<Vec<ChatMessage>> {
        match self.attributes.get(CHAT_MESSAGES_ATTRIBUTE) {
            Some(value) => parse_chat_messages(value),
            None => Ok(Vec::new()),
        }
    }

    /// Chat tools recorded on this span
    pub fn chat_tools(&self) -> Result<Vec<ChatTool>> {
        match self.attributes.get(CHAT_TOOLS_ATTRIBUTE) {
            Some(value) => parse_chat_tools(value),
            None => Ok(Vec::new()),
        }
    }
}
