//! Intent and entity extraction.
//!
//! The model is asked to answer in a line format:
//!
//! ```text
//! Intent: create_booking
//! Entities:
//! - date: tomorrow
//! - party_size: 4
//! ```
//!
//! Parsing is tolerant. Lines that match neither form are skipped, unknown
//! entity keys are dropped, and a reply without an `Intent:` line yields no
//! intent.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use maitre_core::types::{Entities, Intent, TurnMessage};

use crate::error::ChatError;
use crate::llm::LanguageModel;
use crate::prompts::{extraction_prompt, system_prompt};

/// Values models emit for "no value" that are treated as absent.
const PLACEHOLDERS: [&str; 6] = ["none", "null", "n/a", "not specified", "not provided", "unknown"];

/// Intent and entities read from one utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub intent: Option<Intent>,
    pub entities: Entities,
}

#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, utterance: &str) -> Result<Extraction, ChatError>;
}

/// Parse the model's line-format reply.
pub fn parse_extraction(text: &str) -> Extraction {
    let mut extraction = Extraction::default();

    for line in text.lines().map(str::trim) {
        if let Some(label) = line.strip_prefix("Intent:") {
            extraction.intent = Intent::from_label(label);
        } else if let Some(pair) = line.strip_prefix("- ") {
            let Some((key, value)) = pair.split_once(':') else {
                continue;
            };
            let key = key
                .trim()
                .trim_matches(|c| c == '[' || c == ']')
                .to_lowercase();
            let value = value.trim();
            if value.is_empty() || PLACEHOLDERS.contains(&value.to_lowercase().as_str()) {
                continue;
            }
            if !extraction.entities.set(&key, value) {
                tracing::debug!(key = %key, "Dropping unrecognized entity");
            }
        }
    }

    extraction
}

/// Extractor backed by a language model.
pub struct LlmIntentExtractor {
    llm: Arc<dyn LanguageModel>,
    system_prompt: String,
}

impl LlmIntentExtractor {
    pub fn new(llm: Arc<dyn LanguageModel>, restaurant: &str) -> Self {
        Self {
            llm,
            system_prompt: system_prompt(restaurant),
        }
    }
}

#[async_trait]
impl IntentExtractor for LlmIntentExtractor {
    async fn extract(&self, utterance: &str) -> Result<Extraction, ChatError> {
        let messages = [
            TurnMessage::system(self.system_prompt.as_str()),
            TurnMessage::user(extraction_prompt(utterance)),
        ];
        let reply = self.llm.complete(&messages).await?;
        let extraction = parse_extraction(&reply);
        tracing::info!(
            intent = extraction.intent.map(|i| i.as_str()).unwrap_or("none"),
            entities = %extraction.entities,
            "Processed input"
        );
        Ok(extraction)
    }
}

/// Extractor returning canned results, for tests.
///
/// Results are consumed in order; once exhausted every call yields an empty
/// extraction (no intent).
#[derive(Debug, Default)]
pub struct MockIntentExtractor {
    script: Mutex<VecDeque<Result<Extraction, String>>>,
}

impl MockIntentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, extraction: Extraction) {
        self.lock().push_back(Ok(extraction));
    }

    /// Queue an extraction parsed from a model-style reply.
    pub fn push_reply(&self, reply: &str) {
        self.push(parse_extraction(reply));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.lock().push_back(Err(message.into()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<Extraction, String>>> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl IntentExtractor for MockIntentExtractor {
    async fn extract(&self, _utterance: &str) -> Result<Extraction, ChatError> {
        match self.lock().pop_front() {
            Some(Ok(extraction)) => Ok(extraction),
            Some(Err(message)) => Err(ChatError::Extraction(message)),
            None => Ok(Extraction::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLanguageModel;
    use maitre_core::types::Role;

    // ---- Parsing ----

    #[test]
    fn test_parse_full_reply() {
        let e = parse_extraction(
            "Intent: create_booking\nEntities:\n- date: tomorrow\n- time: 7pm\n- party_size: 4\n",
        );
        assert_eq!(e.intent, Some(Intent::CreateBooking));
        assert_eq!(e.entities.date.as_deref(), Some("tomorrow"));
        assert_eq!(e.entities.time.as_deref(), Some("7pm"));
        assert_eq!(e.entities.party_size.as_deref(), Some("4"));
    }

    #[test]
    fn test_parse_value_keeps_later_colons() {
        let e = parse_extraction("Intent: check_availability\n- time: 19:30:00");
        assert_eq!(e.entities.time.as_deref(), Some("19:30:00"));
    }

    #[test]
    fn test_parse_no_intent_line() {
        let e = parse_extraction("Sure! Happy to help.\n- date: today");
        assert_eq!(e.intent, None);
        assert_eq!(e.entities.date.as_deref(), Some("today"));
    }

    #[test]
    fn test_parse_greeting_is_conversation() {
        let e = parse_extraction("Intent: greeting\nEntities:");
        assert_eq!(e.intent, Some(Intent::Conversation));
        assert!(e.entities.is_empty());
    }

    #[test]
    fn test_parse_bracketed_and_uppercase() {
        let e = parse_extraction("  Intent: [CANCEL_BOOKING]  \n  - [Booking_Reference]: ABC1234 ");
        assert_eq!(e.intent, Some(Intent::CancelBooking));
        assert_eq!(e.entities.booking_reference.as_deref(), Some("ABC1234"));
    }

    #[test]
    fn test_parse_skips_malformed_and_unknown() {
        let e = parse_extraction(
            "Intent: get_booking\n- no colon here\n- favourite_dish: pasta\n-date: today\n",
        );
        assert_eq!(e.intent, Some(Intent::GetBooking));
        assert!(e.entities.is_empty());
    }

    #[test]
    fn test_parse_placeholder_values_absent() {
        let e = parse_extraction(
            "Intent: create_booking\n- date: None\n- time: not specified\n- party_size: 2\n- customer_email: N/A",
        );
        assert!(e.entities.date.is_none());
        assert!(e.entities.time.is_none());
        assert!(e.entities.customer_email.is_none());
        assert_eq!(e.entities.party_size.as_deref(), Some("2"));
    }

    #[test]
    fn test_parse_empty_text() {
        assert_eq!(parse_extraction(""), Extraction::default());
    }

    // ---- LLM-backed extractor ----

    #[tokio::test]
    async fn test_llm_extractor_sends_prompts() {
        let llm = Arc::new(MockLanguageModel::new());
        llm.push_reply("Intent: check_availability\n- date: friday\n- party_size: 2");
        let extractor = LlmIntentExtractor::new(llm.clone(), "TheHungryUnicorn");

        let e = extractor.extract("anything free friday for 2?").await.unwrap();
        assert_eq!(e.intent, Some(Intent::CheckAvailability));

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0][0].role, Role::System);
        assert!(requests[0][0].content.contains("TheHungryUnicorn"));
        assert!(requests[0][1]
            .content
            .contains("User message: anything free friday for 2?"));
    }

    #[tokio::test]
    async fn test_llm_extractor_propagates_failure() {
        let llm = Arc::new(MockLanguageModel::new());
        llm.push_error("connection refused");
        let extractor = LlmIntentExtractor::new(llm, "TheHungryUnicorn");
        let err = extractor.extract("hi").await.unwrap_err();
        assert!(matches!(err, ChatError::Llm(_)));
    }

    // ---- Mock ----

    #[tokio::test]
    async fn test_mock_extractor_script() {
        let mock = MockIntentExtractor::new();
        mock.push_reply("Intent: help");
        mock.push_error("model offline");

        let first = mock.extract("help").await.unwrap();
        assert_eq!(first.intent, Some(Intent::Conversation));
        assert!(mock.extract("x").await.is_err());
        assert_eq!(mock.extract("y").await.unwrap().intent, None);
    }
}
