//! # Annotation Block
//!
//! Engine behind the annotation block: short annotation cards fetched from
//! an external API, shown on course/dashboard pages and in the mobile app.
//!
//! ## Architecture
//!
//! ```text
//!  page / mobile request
//!          │ RequestContext (course, module, user)
//!          ▼
//!  ┌────────────────┐  hit   ┌──────────────┐
//!  │ AnnotationFetch│◀──────▶│ Cache (TTL)  │
//!  └───────┬────────┘        └──────────────┘
//!          │ miss
//!          ▼
//!  ┌────────────────┐  body  ┌──────────────┐
//!  │ AnnotationSrc  │───────▶│  Validator   │──▶ cache.set ──▶ render
//!  │  POST api_url  │        │  + sanitize  │
//!  └───────┬────────┘        └──────────────┘
//!          │ error
//!          ▼
//!    fallback data (never cached)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! annot fetch --course 5 --user 9        # print annotations
//! annot render --course 5 --user 9       # print block HTML
//! annot serve                            # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`cache`] | Cache capability, in-memory cache, cache keys |
//! | [`source`] | Outbound API call |
//! | [`fetch`] | Read-through fetcher with fallback |
//! | [`validate`] | Payload validation |
//! | [`sanitize`] | Text and URL cleaning |
//! | [`render`] | HTML rendering |
//! | [`mobile`] | Mobile app handlers |
//! | [`server`] | HTTP server |

pub mod cache;
pub mod config;
pub mod fetch;
pub mod mobile;
pub mod models;
pub mod render;
pub mod sanitize;
pub mod server;
pub mod source;
pub mod validate;
