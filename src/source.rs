//! The outbound annotation API call.
//!
//! [`AnnotationSource`] is the seam between the fetcher and the network.
//! [`HttpSource`] is the production implementation:
//!
//! ```text
//! POST <api_url>
//! Content-Type: application/json
//! Accept: application/json
//!
//! {"course_id": 5, "module_id": 0, "user_id": 9}
//! ```
//!
//! One attempt per call. The overall request is bounded by the configured
//! API timeout and connection setup by the (shorter) connect timeout.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::FetchConfig;
use crate::models::RequestContext;

/// Why a remote fetch produced no usable payload.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to annotation API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("annotation API returned HTTP {status}")]
    Status { status: u16 },

    #[error("annotation API response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("annotation API response is not a JSON array (got {found})")]
    NotArray { found: &'static str },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Transport(e) if e.is_timeout())
    }
}

/// Performs the remote call for a request and returns the raw body of a
/// successful (2xx) response.
#[async_trait]
pub trait AnnotationSource: Send + Sync {
    async fn request(
        &self,
        context: &RequestContext,
        config: &FetchConfig,
    ) -> Result<String, FetchError>;
}

/// JSON body sent to the annotation API.
#[derive(Debug, Serialize)]
struct AnnotationRequest {
    course_id: i64,
    module_id: i64,
    user_id: i64,
}

impl From<&RequestContext> for AnnotationRequest {
    fn from(ctx: &RequestContext) -> Self {
        Self {
            course_id: ctx.course_id,
            module_id: ctx.module_id,
            user_id: ctx.user_id,
        }
    }
}

/// reqwest-backed [`AnnotationSource`].
#[derive(Debug, Default, Clone)]
pub struct HttpSource;

impl HttpSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnnotationSource for HttpSource {
    async fn request(
        &self,
        context: &RequestContext,
        config: &FetchConfig,
    ) -> Result<String, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.api_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        let response = client
            .post(&config.api_url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&AnnotationRequest::from(context))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
