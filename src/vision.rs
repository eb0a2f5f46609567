//! # Item Recognition Module
//!
//! Wraps the vision capability: image bytes in, ordered list of recognized
//! food item names out.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{CapabilityConfig, RecoveryConfig};
use crate::errors::RecognitionError;
use crate::llm::{ChatCompletion, ChatMessage, ChatRequest, ContentPart, GuardedCompletion};
use crate::structured_output::{parse_object_or_lines, LineFallback, Schema};

const RECOGNITION_PROMPT: &str = "List all food products in this image.\n\
Return only JSON: {\"items\": [\"product1\", \"product2\"]}.\n\
Maximum 20 products.";

/// Ordered, non-empty list of item names recognized in one photo.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecognizedItems {
    #[serde(default)]
    pub items: Vec<String>,
}

impl RecognizedItems {
    fn normalized(self) -> Self {
        let items = self
            .items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
        Self { items }
    }
}

impl Schema for RecognizedItems {
    fn missing_field(&self) -> Option<&'static str> {
        if self.items.iter().all(|item| item.trim().is_empty()) {
            Some("items")
        } else {
            None
        }
    }
}

impl LineFallback for RecognizedItems {
    fn from_lines(lines: Vec<String>) -> Self {
        Self { items: lines }
    }
}

/// Parse vision output: strict JSON first, then one item per plain line.
pub fn parse_recognized_items(text: &str) -> Result<RecognizedItems, RecognitionError> {
    let items: RecognizedItems = parse_object_or_lines(text)?;
    Ok(items.normalized())
}

/// Mime type for the image formats the vision capability accepts.
pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        image::ImageFormat::Jpeg => Some("image/jpeg"),
        image::ImageFormat::Png => Some("image/png"),
        image::ImageFormat::WebP => Some("image/webp"),
        image::ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

/// Item-recognition adapter over a chat-completion vision model.
pub struct ItemRecognizer {
    completion: GuardedCompletion,
    model: String,
    max_tokens: u32,
}

impl ItemRecognizer {
    pub fn new(
        client: Arc<dyn ChatCompletion>,
        config: &CapabilityConfig,
        recovery: &RecoveryConfig,
    ) -> Self {
        Self {
            completion: GuardedCompletion::new(client, recovery),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    pub async fn recognize(&self, image: &[u8]) -> Result<RecognizedItems, RecognitionError> {
        let mime_type = detect_mime_type(image).ok_or(RecognitionError::UnsupportedImage)?;
        let encoded = STANDARD.encode(image);
        debug!(
            image_bytes = image.len(),
            encoded_len = encoded.len(),
            mime_type,
            "Sending image to vision capability"
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user_parts(vec![
                ContentPart::text(RECOGNITION_PROMPT),
                ContentPart::inline_image(mime_type, &encoded),
            ])],
            max_tokens: self.max_tokens,
        };

        let content = self.completion.complete(request).await?;
        debug!(content = %content, "Vision capability response");

        match parse_recognized_items(&content) {
            Ok(items) => {
                info!(items_count = items.items.len(), "Items recognized");
                Ok(items)
            }
            Err(RecognitionError::Malformed(e)) => {
                warn!(error = %e, raw = e.raw().unwrap_or(&content), "Vision output could not be decoded");
                Err(RecognitionError::Malformed(e))
            }
            Err(e) => Err(e),
        }
    }
}
