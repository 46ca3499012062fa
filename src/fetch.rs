//! Read-through, fail-soft annotation fetcher.
//!
//! # Flow
//!
//! ```text
//! RequestContext ──▶ cache_key ──▶ cache hit? ──yes──▶ Cached(list)
//!                                      │ no
//!                                      ▼
//!                              AnnotationSource (POST)
//!                                      │
//!                  ┌──── error ────────┼──── body ────┐
//!                  ▼                                   ▼
//!           Fallback(static)              parse → array? → validate
//!           (not cached)                               │
//!                                                      ▼
//!                                         cache.set(ttl) → Fresh(list)
//! ```
//!
//! A single attempt per call, no retries. Failures are logged and converted
//! to fallback data; [`AnnotationFetcher::fetch`] never fails outwardly.
//! A transient failure is never cached, so the next request retries.

use serde_json::Value;
use std::sync::Arc;

use crate::cache::{cache_key, AnnotationCache, MemoryCache};
use crate::config::FetchConfig;
use crate::models::{Annotation, FetchOutcome, RequestContext};
use crate::source::{AnnotationSource, FetchError, HttpSource};
use crate::validate::validate;

pub const FALLBACK_TITLE: &str = "Sample Annotation";

/// Static data returned whenever the remote source is unusable.
///
/// Doubles as the visible signal that the API URL is wrong or unreachable.
pub fn fallback_annotations() -> Vec<Annotation> {
    vec![Annotation {
        title: FALLBACK_TITLE.to_string(),
        description: "This is a sample annotation. Configure the API URL in block settings to fetch real data.".to_string(),
        kind: "example".to_string(),
        image_url: String::new(),
        content: "API connection failed or no data available. Please check your API configuration.".to_string(),
    }]
}

/// Memoizing fetch-with-fallback over an [`AnnotationSource`].
#[derive(Clone)]
pub struct AnnotationFetcher {
    cache: Arc<dyn AnnotationCache>,
    source: Arc<dyn AnnotationSource>,
}

impl AnnotationFetcher {
    pub fn new(cache: Arc<dyn AnnotationCache>, source: Arc<dyn AnnotationSource>) -> Self {
        Self { cache, source }
    }

    /// HTTP source with a fresh in-memory cache.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(MemoryCache::new()), Arc::new(HttpSource::new()))
    }

    /// Validated annotations for `context`, or fallback data.
    pub async fn fetch(&self, context: &RequestContext, config: &FetchConfig) -> Vec<Annotation> {
        self.fetch_outcome(context, config).await.into_annotations()
    }

    /// Same as [`fetch`](Self::fetch), but reports where the list came from.
    pub async fn fetch_outcome(
        &self,
        context: &RequestContext,
        config: &FetchConfig,
    ) -> FetchOutcome {
        let key = cache_key(&config.api_url, context);

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(%key, count = cached.len(), "annotation cache hit");
            return FetchOutcome::Cached(cached);
        }
        tracing::debug!(%key, url = %config.api_url, "annotation cache miss");

        match self.fetch_remote(context, config).await {
            Ok(annotations) => {
                self.cache.set(&key, annotations.clone(), config.cache_ttl);
                FetchOutcome::Fresh(annotations)
            }
            Err(err) => {
                tracing::warn!(
                    url = %config.api_url,
                    course_id = context.course_id,
                    module_id = context.module_id,
                    timeout = err.is_timeout(),
                    error = %err,
                    "annotation API unavailable, serving fallback data"
                );
                FetchOutcome::Fallback(fallback_annotations())
            }
        }
    }

    async fn fetch_remote(
        &self,
        context: &RequestContext,
        config: &FetchConfig,
    ) -> Result<Vec<Annotation>, FetchError> {
        let body = self.source.request(context, config).await?;
        let raw = parse_payload(&body)?;
        Ok(validate(&raw))
    }
}

/// Parse a response body that must be a top-level JSON array.
pub fn parse_payload(body: &str) -> Result<Vec<Value>, FetchError> {
    match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => Ok(items),
        other => Err(FetchError::NotArray {
            found: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
