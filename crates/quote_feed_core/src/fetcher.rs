//! crates/quote_feed_core/src/fetcher.rs
//!
//! The batch fetcher: turns a category and the recent window into a prompt,
//! calls the generation port, validates what comes back and applies the
//! fallback policy when the service fails.

use crate::domain::{Category, Quote};
use crate::ports::{GenerationRequest, PortError, QuoteGenerationService};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of quotes requested per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

//=========================================================================================
// Errors and Policy
//=========================================================================================

/// Why a batch could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The generation service could not be reached or refused the request.
    #[error("Quote service unavailable: {0}")]
    Network(String),
    /// The service answered, but nothing in the answer was a usable quote.
    #[error("Quote service returned unusable data: {0}")]
    Malformed(String),
}

impl From<PortError> for FetchError {
    fn from(err: PortError) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// What the fetcher does when the service fails or returns no valid quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Answer with the built-in fallback quotes as if they were a normal batch.
    #[default]
    Serve,
    /// Report the failure to the caller.
    Surface,
}

impl std::str::FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serve" => Ok(FallbackPolicy::Serve),
            "surface" => Ok(FallbackPolicy::Surface),
            other => Err(format!("'{}' is not one of: serve, surface", other)),
        }
    }
}

/// The quotes served when the generation service lets us down.
pub fn fallback_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            "子曰：學而時習之，不亦說乎？",
            "孔子",
            "Confucius said: 'To learn and then have occasion to practice what you have learned—is this not satisfying?'",
            Some("論語·學而篇".to_string()),
        ),
        Quote::new(
            "Veni, vidi, vici.",
            "Gaius Iulius Caesar",
            "I came, I saw, I conquered.",
            Some("Life of Caesar by Plutarch".to_string()),
        ),
    ]
}

//=========================================================================================
// The BatchFetcher Seam
//=========================================================================================

/// Produces a batch of candidate quotes. The freshness filter only sees this trait.
#[async_trait]
pub trait BatchFetcher: Send + Sync {
    async fn request_batch(
        &self,
        category: Category,
        recent: &[Quote],
    ) -> Result<Vec<Quote>, FetchError>;
}

//=========================================================================================
// Prompt
//=========================================================================================

/// Builds the instruction sent to the generation service.
pub fn build_prompt(category: Category, recent: &[Quote], count: usize) -> String {
    let category_part = if category.is_any() {
        format!(
            "Generate {count} random, profound, and lesser-known philosophical quotes from a diverse range of cultures and time periods (e.g., Ancient Greek, Roman, Latin American, African, Middle Eastern, Indian, East Asian philosophies)."
        )
    } else {
        format!(
            "Generate {count} profound and lesser-known philosophical quotes strictly related to the category of \"{}\" ({}). The quotes should come from a diverse range of cultures and time periods.",
            category.label(),
            category.slug()
        )
    };

    let mut prompt = format!(
        "{category_part} For each quote, provide the original text, the author's name in their native language script, a Chinese translation, and the source (book, speech, etc.) if known."
    );

    if !recent.is_empty() {
        let avoided = recent
            .iter()
            .map(|q| format!("\"{}\"", q.text()))
            .collect::<Vec<_>>()
            .join(", ");
        prompt.push_str(&format!(
            " Please do not include the following quotes: {avoided}"
        ));
    }

    prompt
}

//=========================================================================================
// Validation
//=========================================================================================

/// The outcome of checking a raw service payload against the batch schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchValidation {
    /// At least one entry carried the required fields. Bad entries were dropped.
    Valid(Vec<Quote>),
    Invalid(String),
}

/// Validates the raw JSON text returned by the generation service.
///
/// The payload must be an array of quote objects, or an object holding that
/// array under `quotes`. An entry needs non-empty `quote` (or `text`),
/// `author` and `translation` strings; `source` is optional.
pub fn validate_batch(raw: &str) -> BatchValidation {
    let payload: Value = match serde_json::from_str(raw.trim()) {
        Ok(v) => v,
        Err(e) => return BatchValidation::Invalid(format!("response is not JSON: {e}")),
    };

    let entries = match &payload {
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("quotes") {
            Some(Value::Array(entries)) => entries,
            _ => return BatchValidation::Invalid("object has no `quotes` array".to_string()),
        },
        _ => return BatchValidation::Invalid("expected an array of quotes".to_string()),
    };

    let total = entries.len();
    let quotes: Vec<Quote> = entries.iter().filter_map(validate_entry).collect();

    if quotes.is_empty() {
        return BatchValidation::Invalid(format!("none of {total} entries were valid quotes"));
    }
    if quotes.len() < total {
        debug!("Dropped {} malformed entries from batch", total - quotes.len());
    }
    BatchValidation::Valid(quotes)
}

fn validate_entry(entry: &Value) -> Option<Quote> {
    let field = |name: &str| {
        entry
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let text = field("quote").or_else(|| field("text"))?;
    let author = field("author")?;
    let translation = field("translation")?;
    let source = field("source").map(str::to_string);

    Some(Quote::new(text, author, translation, source))
}

//=========================================================================================
// The Service-backed Fetcher
//=========================================================================================

/// A `BatchFetcher` backed by a `QuoteGenerationService`.
#[derive(Clone)]
pub struct ServiceBatchFetcher {
    service: Arc<dyn QuoteGenerationService>,
    batch_size: usize,
    policy: FallbackPolicy,
}

impl ServiceBatchFetcher {
    pub fn new(
        service: Arc<dyn QuoteGenerationService>,
        batch_size: usize,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            service,
            batch_size,
            policy,
        }
    }

    fn recover(&self, err: FetchError) -> Result<Vec<Quote>, FetchError> {
        match self.policy {
            FallbackPolicy::Serve => {
                warn!("{}; using fallback quotes.", err);
                Ok(fallback_quotes())
            }
            FallbackPolicy::Surface => Err(err),
        }
    }
}

#[async_trait]
impl BatchFetcher for ServiceBatchFetcher {
    async fn request_batch(
        &self,
        category: Category,
        recent: &[Quote],
    ) -> Result<Vec<Quote>, FetchError> {
        let request = GenerationRequest {
            prompt: build_prompt(category, recent, self.batch_size),
            count: self.batch_size,
        };

        let raw = match self.service.generate_quotes(&request).await {
            Ok(raw) => raw,
            Err(e) => return self.recover(FetchError::from(e)),
        };

        match validate_batch(&raw) {
            BatchValidation::Valid(quotes) => {
                debug!("Received {} valid quotes for category {}", quotes.len(), category);
                Ok(quotes)
            }
            BatchValidation::Invalid(reason) => self.recover(FetchError::Malformed(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortResult;
    use std::sync::Mutex;

    struct ScriptedService {
        reply: PortResult<String>,
        prompts: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedService {
        fn new(reply: PortResult<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl QuoteGenerationService for ScriptedService {
        async fn generate_quotes(&self, request: &GenerationRequest) -> PortResult<String> {
            self.prompts.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }

    #[test]
    fn any_category_asks_for_diverse_cultures() {
        let prompt = build_prompt(Category::Any, &[], 10);
        assert!(prompt.starts_with("Generate 10 random"));
        assert!(prompt.contains("East Asian"));
        assert!(!prompt.contains("do not include"));
    }

    #[test]
    fn prompt_lists_recent_quotes_to_avoid() {
        let recent = vec![Quote::new("Carpe diem.", "Horace", "及时行乐。", None)];
        let prompt = build_prompt(Category::Courage, &recent, 10);
        assert!(prompt.contains("勇气"));
        assert!(prompt.contains("Please do not include the following quotes: \"Carpe diem.\""));
    }

    #[test]
    fn validation_drops_incomplete_entries() {
        let raw = r#"[
            {"quote": "Memento mori.", "author": "Seneca", "translation": "记住你终有一死。", "source": ""},
            {"quote": "", "author": "Nobody", "translation": "空"},
            {"text": "Know thyself.", "author": "Socrates", "translation": "认识你自己。", "source": "Delphi"},
            {"quote": "No translation", "author": "Someone"},
            42
        ]"#;

        match validate_batch(raw) {
            BatchValidation::Valid(quotes) => {
                assert_eq!(quotes.len(), 2);
                assert_eq!(quotes[0].source(), None);
                assert_eq!(quotes[1].text(), "Know thyself.");
                assert_eq!(quotes[1].source(), Some("Delphi"));
            }
            other => panic!("expected a valid batch, got {other:?}"),
        }
    }

    #[test]
    fn validation_accepts_wrapped_array() {
        let raw = r#"{"quotes": [{"quote": "a", "author": "b", "translation": "c"}]}"#;
        assert!(matches!(validate_batch(raw), BatchValidation::Valid(q) if q.len() == 1));
    }

    #[test]
    fn validation_rejects_empty_and_non_json() {
        assert!(matches!(validate_batch("[]"), BatchValidation::Invalid(_)));
        assert!(matches!(validate_batch("not json"), BatchValidation::Invalid(_)));
        assert!(matches!(validate_batch(r#"{"items": []}"#), BatchValidation::Invalid(_)));
    }

    #[tokio::test]
    async fn serve_policy_answers_outage_with_fallback() {
        let service = ScriptedService::new(Err(PortError::Unavailable("timeout".to_string())));
        let fetcher = ServiceBatchFetcher::new(service.clone(), 10, FallbackPolicy::Serve);

        let batch = fetcher.request_batch(Category::Love, &[]).await.unwrap();
        assert_eq!(batch, fallback_quotes());
        assert_eq!(service.prompts.lock().unwrap()[0].count, 10);
    }

    #[tokio::test]
    async fn serve_policy_answers_empty_batch_with_fallback() {
        let service = ScriptedService::new(Ok("[]".to_string()));
        let fetcher = ServiceBatchFetcher::new(service, 10, FallbackPolicy::Serve);

        let batch = fetcher.request_batch(Category::Any, &[]).await.unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn surface_policy_reports_failures() {
        let down = ScriptedService::new(Err(PortError::Unavailable("timeout".to_string())));
        let fetcher = ServiceBatchFetcher::new(down, 10, FallbackPolicy::Surface);
        assert!(matches!(
            fetcher.request_batch(Category::Any, &[]).await,
            Err(FetchError::Network(_))
        ));

        let garbage = ScriptedService::new(Ok("<html>".to_string()));
        let fetcher = ServiceBatchFetcher::new(garbage, 10, FallbackPolicy::Surface);
        assert!(matches!(
            fetcher.request_batch(Category::Any, &[]).await,
            Err(FetchError::Malformed(_))
        ));
    }
}
