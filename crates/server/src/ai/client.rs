//! HTTP client for an OpenAI-compatible chat-completions API.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::config::AiConfig;

use super::error::{AiError, ApiErrorBody};
use super::types::{
    ChatMessage, ChatRequest, ChatResponse, MenuItem, MenuReply, OcrDocument, OcrRequest, OcrResponse,
};

const MENU_SYSTEM_PROMPT: &str = "You extract structured data from cafe menus. \
Reply with only a JSON array. Each element is an object with the keys \
name (string), calories (integer kcal), price (number), ingredients (string or null), \
quantity (serving size as printed, string or null), servings (number or null), \
veg_flag (boolean) and kind (drink, wrap, salad, ... or null). \
Estimate calories when the menu does not print them. Do not invent items.";

const SUMMARY_SYSTEM_PROMPT: &str = "You summarize customer reviews of cafes. \
Summarize the reviews into 3-5 concise bullet points and state the overall \
sentiment (positive, neutral, or negative).";

const SUMMARY_MAX_TOKENS: u32 = 300;

/// Menu and review AI client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct AiClient {
    inner: Arc<AiClientInner>,
}

struct AiClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    ocr_model: String,
}

impl AiClient {
    /// Create a client with the configured per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(AiClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key: config.api_key.clone(),
                model: config.model.clone(),
                ocr_model: config.ocr_model.clone(),
            }),
        })
    }

    /// Turn raw menu text into structured items.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Unparseable` if the reply is not an item list, and
    /// `AiError::Http` or `AiError::Api` if the call fails.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn parse_menu_text(&self, text: &str) -> Result<Vec<MenuItem>, AiError> {
        let reply = self
            .chat(
                vec![ChatMessage::system(MENU_SYSTEM_PROMPT), ChatMessage::user(text)],
                None,
            )
            .await?;

        let items = parse_menu_reply(&reply)?;
        tracing::info!(count = items.len(), "Menu text parsed");
        Ok(items)
    }

    /// OCR a PDF menu, then structure its text.
    ///
    /// # Errors
    ///
    /// Same as [`AiClient::parse_menu_text`]; a document without any text is
    /// `AiError::Unparseable`.
    #[instrument(skip(self, pdf), fields(bytes = pdf.len()))]
    pub async fn parse_menu_document(&self, pdf: &[u8]) -> Result<Vec<MenuItem>, AiError> {
        let request = OcrRequest {
            model: &self.inner.ocr_model,
            document: OcrDocument {
                kind: "document_url",
                document_url: format!("data:application/pdf;base64,{}", STANDARD.encode(pdf)),
            },
        };
        let response: OcrResponse = self.post("ocr", &request).await?;

        let text = response
            .pages
            .iter()
            .map(|page| page.markdown.trim())
            .filter(|markdown| !markdown.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        if text.is_empty() {
            return Err(AiError::Unparseable("document contains no text".to_string()));
        }

        tracing::debug!(pages = response.pages.len(), "Menu document recognized");
        self.parse_menu_text(&text).await
    }

    /// Bullet-point summary with overall sentiment.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Http` or `AiError::Api` if the call fails and
    /// `AiError::Unparseable` for an empty reply.
    #[instrument(skip(self, reviews), fields(count = reviews.len()))]
    pub async fn summarize_reviews(&self, reviews: &[String]) -> Result<String, AiError> {
        let listing = reviews
            .iter()
            .map(|review| format!("- {}", review.trim()))
            .collect::<Vec<_>>()
            .join("\n");

        let summary = self
            .chat(
                vec![
                    ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
                    ChatMessage::user(format!("REVIEWS:\n{listing}")),
                ],
                Some(SUMMARY_MAX_TOKENS),
            )
            .await?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(AiError::Unparseable("empty summary".to_string()));
        }
        Ok(summary.to_string())
    }

    async fn chat(&self, messages: Vec<ChatMessage>, max_tokens: Option<u32>) -> Result<String, AiError> {
        let request = ChatRequest {
            model: &self.inner.model,
            messages,
            temperature: 0.0,
            max_tokens,
        };
        let response: ChatResponse = self.post("chat/completions", &request).await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AiError::Unparseable("reply has no choices".to_string()))
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, AiError> {
        let response = self
            .inner
            .client
            .post(format!("{}/{path}", self.inner.base_url))
            .bearer_auth(self.inner.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map_or(text, ApiErrorBody::into_message);
            tracing::warn!(status = status.as_u16(), %message, "AI service returned an error");
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| AiError::Unparseable(format!("unexpected response: {e}")))
    }
}

/// Extract the item list from a model reply, tolerating Markdown fences and
/// prose around the JSON.
fn parse_menu_reply(reply: &str) -> Result<Vec<MenuItem>, AiError> {
    let trimmed = strip_fences(reply.trim());

    if let Ok(parsed) = serde_json::from_str::<MenuReply>(trimmed) {
        return Ok(parsed.into_items());
    }

    let embedded = match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => return Err(AiError::Unparseable("reply contains no item list".to_string())),
    };
    serde_json::from_str::<Vec<MenuItem>>(embedded)
        .map_err(|e| AiError::Unparseable(format!("invalid item list: {e}")))
}

fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> AiClient {
        AiClient::new(&AiConfig {
            base_url: format!("{}/v1/", server.uri()),
            api_key: SecretString::from("test-key"),
            model: "mistral-small-latest".to_string(),
            ocr_model: "mistral-ocr-latest".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    fn chat_reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    #[test]
    fn fenced_reply_is_parsed() {
        let reply = "```json\n[{\"name\":\"Paneer Wrap\",\"calories\":550,\"price\":8.99,\"kind\":\"wrap\"}]\n```";
        let items = parse_menu_reply(reply).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Paneer Wrap");
        assert_eq!(items[0].price, Decimal::new(899, 2));
        assert!(items[0].veg_flag);
    }

    #[test]
    fn wrapped_and_embedded_replies_are_parsed() {
        let wrapped = r#"{"items":[{"name":"Latte","calories":190,"price":4.5,"veg_flag":true}]}"#;
        assert_eq!(parse_menu_reply(wrapped).unwrap().len(), 1);

        let chatty = r#"Here is the menu: [{"name":"Bagel","calories":250,"price":2}] Enjoy!"#;
        assert_eq!(parse_menu_reply(chatty).unwrap()[0].name, "Bagel");
    }

    #[test]
    fn prose_is_unparseable() {
        assert!(matches!(
            parse_menu_reply("Sorry, I cannot read this menu."),
            Err(AiError::Unparseable(_))
        ));
    }

    #[tokio::test]
    async fn parse_menu_text_calls_chat_completions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({ "model": "mistral-small-latest" })))
            .respond_with(chat_reply(
                r#"[{"name":"Chicken Caesar Salad","calories":430,"price":9.49,"veg_flag":false,"kind":"salad"}]"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let items = client(&server).parse_menu_text("Chicken Caesar Salad 9.49").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].calories, 430);
        assert!(!items[0].veg_flag);
    }

    #[tokio::test]
    async fn document_goes_through_ocr_first() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ocr"))
            .and(body_partial_json(serde_json::json!({
                "model": "mistral-ocr-latest",
                "document": { "type": "document_url", "document_url": "data:application/pdf;base64,JVBERi0=" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "pages": [{ "index": 0, "markdown": "# Drinks\nLatte 4.50" }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(chat_reply(r#"[{"name":"Latte","calories":190,"price":4.5}]"#))
            .expect(1)
            .mount(&server)
            .await;

        let items = client(&server).parse_menu_document(b"%PDF-").await.unwrap();
        assert_eq!(items[0].name, "Latte");
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(serde_json::json!({ "message": "Rate limit exceeded" })),
            )
            .mount(&server)
            .await;

        let err = client(&server).summarize_reviews(&["Great coffee".to_string()]).await.unwrap_err();
        match err {
            AiError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn summary_is_trimmed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({ "max_tokens": 300 })))
            .respond_with(chat_reply("\n- Friendly staff\n- Overall: positive\n"))
            .mount(&server)
            .await;

        let summary = client(&server)
            .summarize_reviews(&["Friendly staff".to_string()])
            .await
            .unwrap();
        assert_eq!(summary, "- Friendly staff\n- Overall: positive");
    }

    #[test]
    fn client_is_clone_send_sync() {
        fn assert_traits<T: Clone + Send + Sync>() {}
        assert_traits::<AiClient>();
    }
}
