//! External AI service used for menu ingestion and review summaries.
//!
//! The service speaks the OpenAI-compatible chat-completions protocol plus an
//! OCR endpoint for PDF menus. It is optional: without `MENU_AI_API_KEY` the
//! dependent endpoints answer 503.
//!
//! Parsing never writes catalog state. Parsed items are returned to the
//! caller, who imports them separately.

mod client;
mod error;
mod types;

pub use client::AiClient;
pub use error::AiError;
pub use types::MenuItem;
