//! Core data models shared by the fetcher, renderer and handlers.

use serde::{Deserialize, Serialize};

/// Identifies who is looking at the block and where.
///
/// Built explicitly per page view or mobile request; nothing in the crate
/// reads ambient page/course/user state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestContext {
    pub course_id: i64,
    /// `0` outside a course module.
    pub module_id: i64,
    pub user_id: i64,
}

impl RequestContext {
    pub fn new(course_id: i64, module_id: i64, user_id: i64) -> Self {
        Self {
            course_id,
            module_id,
            user_id,
        }
    }
}

/// A single displayable annotation card.
///
/// Only produced by [`validate`](crate::validate::validate) or the fallback
/// data, so `title` is non-empty and every field is sanitized plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub image_url: String,
    pub content: String,
}

/// Where a fetched annotation list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Served from a live cache entry; no remote call was made.
    Cached(Vec<Annotation>),
    /// Fetched and validated from the remote API, now cached.
    Fresh(Vec<Annotation>),
    /// The remote call or its payload failed; static fallback data.
    Fallback(Vec<Annotation>),
}

impl FetchOutcome {
    pub fn annotations(&self) -> &[Annotation] {
        match self {
            FetchOutcome::Cached(a) | FetchOutcome::Fresh(a) | FetchOutcome::Fallback(a) => a,
        }
    }

    pub fn into_annotations(self) -> Vec<Annotation> {
        match self {
            FetchOutcome::Cached(a) | FetchOutcome::Fresh(a) | FetchOutcome::Fallback(a) => a,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, FetchOutcome::Fallback(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Cached(_) => "cached",
            FetchOutcome::Fresh(_) => "fresh",
            FetchOutcome::Fallback(_) => "fallback",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_serializes_type_field() {
        let a = Annotation {
            title: "T".into(),
            kind: "article".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["type"], "article");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_outcome_accessors() {
        let a = vec![Annotation {
            title: "T".into(),
            ..Default::default()
        }];
        let outcome = FetchOutcome::Fallback(a.clone());
        assert!(outcome.is_fallback());
        assert_eq!(outcome.label(), "fallback");
        assert_eq!(outcome.annotations(), a.as_slice());
        assert_eq!(outcome.into_annotations(), a);
    }
}
