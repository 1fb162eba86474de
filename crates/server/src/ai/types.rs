//! Wire types for the chat-completions and OCR endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::NewItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
}

#[derive(Debug, Serialize)]
pub struct OcrRequest<'a> {
    pub model: &'a str,
    pub document: OcrDocument,
}

#[derive(Debug, Serialize)]
pub struct OcrDocument {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub document_url: String,
}

#[derive(Debug, Deserialize)]
pub struct OcrResponse {
    #[serde(default)]
    pub pages: Vec<OcrPage>,
}

#[derive(Debug, Deserialize)]
pub struct OcrPage {
    #[serde(default)]
    pub markdown: String,
}

/// One item extracted from a menu. Not yet part of any cafe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    pub name: String,
    pub calories: i32,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub servings: Option<f64>,
    #[serde(default = "default_veg")]
    pub veg_flag: bool,
    #[serde(default)]
    pub kind: Option<String>,
}

const fn default_veg() -> bool {
    true
}

impl From<MenuItem> for NewItem {
    fn from(item: MenuItem) -> Self {
        Self {
            name: item.name,
            description: None,
            ingredients: item.ingredients,
            calories: item.calories,
            price: item.price,
            quantity: item.quantity,
            servings: item.servings,
            veg_flag: item.veg_flag,
            kind: item.kind,
        }
    }
}

/// Models answer either with a bare array or with `{"items": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MenuReply {
    Items(Vec<MenuItem>),
    Wrapped { items: Vec<MenuItem> },
}

impl MenuReply {
    pub(crate) fn into_items(self) -> Vec<MenuItem> {
        match self {
            Self::Items(items) | Self::Wrapped { items } => items,
        }
    }
}
