//! Deterministic stand-ins for the extractor and model backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::{EvaluationClient, EvaluationClientError};
use crate::screening::extractor::{
    concat_pages, DocumentTextExtractor, ExtractedText, ExtractionError,
};

/// Returns canned answers in order, then `NoResponse` once exhausted.
#[derive(Default)]
pub struct StubClient {
    responses: Mutex<VecDeque<Result<String, EvaluationClientError>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(raw: &str) -> Self {
        Self::new().then_ok(raw)
    }

    /// Sleeps this long before every answer.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn then_ok(self, raw: &str) -> Self {
        self.push(Ok(raw.to_string()))
    }

    pub fn then_err(self, err: EvaluationClientError) -> Self {
        self.push(Err(err))
    }

    fn push(self, response: Result<String, EvaluationClientError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl EvaluationClient for StubClient {
    async fn evaluate(&self, prompt: &str) -> Result<String, EvaluationClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(EvaluationClientError::NoResponse))
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

/// Treats the document bytes as UTF-8 with pages separated by form feeds.
/// Bytes registered with `failing_on` fail to decode.
#[derive(Default)]
pub struct StubExtractor {
    failing: HashMap<Vec<u8>, ExtractionError>,
    calls: Arc<AtomicUsize>,
}

impl StubExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, document: &[u8], err: ExtractionError) -> Self {
        self.failing.insert(document.to_vec(), err);
        self
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl DocumentTextExtractor for StubExtractor {
    fn extract(&self, document: &[u8]) -> Result<ExtractedText, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failing.get(document) {
            return Err(err.clone());
        }
        if document.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        let text = std::str::from_utf8(document)
            .map_err(|e| ExtractionError::Decode(e.to_string()))?;
        concat_pages(text.split('\u{c}'))
    }
}
