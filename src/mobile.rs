//! Mobile app entry points.
//!
//! The app dispatches two handlers, the in-course block view and the
//! main-menu page. Both build a [`RequestContext`] from the incoming
//! arguments, go through the same [`AnnotationFetcher::fetch`] and return
//! the payload shape the app expects:
//!
//! ```json
//! { "templates": [{ "id": "main", "html": "..." }], "javascript": "", "otherdata": {} }
//! ```

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::FetchConfig;
use crate::fetch::AnnotationFetcher;
use crate::models::RequestContext;
use crate::render::{render_annotation_list, RenderOptions};

/// Course id used when the request is not inside a course.
pub const SITE_COURSE_ID: i64 = 1;

/// Arguments the app sends with a handler call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MobileArgs {
    #[serde(default)]
    pub courseid: Option<i64>,
    #[serde(default)]
    pub cmid: Option<i64>,
    /// Older app versions send the module id as `id`; `cmid` wins when both arrive.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub userid: Option<i64>,
}

impl MobileArgs {
    /// Missing or non-positive course ids map to the site course; a missing
    /// module id means "not in a module". The user id is required.
    pub fn context(&self) -> Result<RequestContext> {
        let user_id = match self.userid {
            Some(id) if id > 0 => id,
            Some(id) => bail!("invalid userid: {}", id),
            None => bail!("userid is required"),
        };
        let course_id = match self.courseid {
            Some(id) if id > 0 => id,
            _ => SITE_COURSE_ID,
        };
        let module_id = self.cmid.or(self.id).filter(|id| *id > 0).unwrap_or(0);

        Ok(RequestContext::new(course_id, module_id, user_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobileMethod {
    BlockView,
    MainMenuView,
}

impl MobileMethod {
    pub fn name(&self) -> &'static str {
        match self {
            MobileMethod::BlockView => "mobile_view",
            MobileMethod::MainMenuView => "mobile_main_menu_view",
        }
    }
}

impl FromStr for MobileMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mobile_view" => Ok(MobileMethod::BlockView),
            "mobile_main_menu_view" => Ok(MobileMethod::MainMenuView),
            other => bail!("unknown mobile method: {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MobileTemplate {
    pub id: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MobileContent {
    pub templates: Vec<MobileTemplate>,
    pub javascript: String,
    pub otherdata: serde_json::Map<String, serde_json::Value>,
}

/// Block view handler.
pub async fn mobile_view(
    fetcher: &AnnotationFetcher,
    config: &FetchConfig,
    args: &MobileArgs,
) -> Result<MobileContent> {
    handle(fetcher, config, args, MobileMethod::BlockView).await
}

/// Main menu view handler.
pub async fn mobile_main_menu_view(
    fetcher: &AnnotationFetcher,
    config: &FetchConfig,
    args: &MobileArgs,
) -> Result<MobileContent> {
    handle(fetcher, config, args, MobileMethod::MainMenuView).await
}

/// Dispatch by method.
pub async fn handle(
    fetcher: &AnnotationFetcher,
    config: &FetchConfig,
    args: &MobileArgs,
    method: MobileMethod,
) -> Result<MobileContent> {
    let context = args.context()?;
    let annotations = fetcher.fetch(&context, config).await;

    let options = RenderOptions {
        main_menu: method == MobileMethod::MainMenuView,
    };
    let html = render_annotation_list(&annotations, options);

    Ok(MobileContent {
        templates: vec![MobileTemplate {
            id: "main".to_string(),
            html,
        }],
        javascript: String::new(),
        otherdata: serde_json::Map::new(),
    })
}
