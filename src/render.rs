//! HTML rendering for the annotation list and the block body.
//!
//! Every field is HTML-escaped here even though the validator already
//! stripped markup; the list is safe to embed in a page or a mobile template.

use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;
use std::fmt::Write;

use crate::models::Annotation;

pub const NO_ANNOTATIONS: &str = "No annotations available.";

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Rendered as the mobile main-menu page rather than inside a block.
    pub main_menu: bool,
}

/// Rendered block, ready for the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockContent {
    pub title: String,
    pub text: String,
    pub footer: String,
}

pub fn render_annotation_list(annotations: &[Annotation], options: RenderOptions) -> String {
    let mut html = String::new();
    let class = if options.main_menu {
        "block-annotation block-annotation--main-menu"
    } else {
        "block-annotation"
    };

    if annotations.is_empty() {
        let _ = write!(
            html,
            "<div class=\"{} block-annotation--empty\"><p>{}</p></div>",
            class,
            encode_text(NO_ANNOTATIONS)
        );
        return html;
    }

    let _ = write!(html, "<div class=\"{}\"><ul class=\"annotation-list\">", class);
    for a in annotations {
        html.push_str("<li class=\"annotation\"");
        if !a.kind.is_empty() {
            let _ = write!(html, " data-type=\"{}\"", encode_double_quoted_attribute(&a.kind));
        }
        html.push('>');

        if !a.image_url.is_empty() {
            let _ = write!(
                html,
                "<img class=\"annotation-image\" src=\"{}\" alt=\"{}\">",
                encode_double_quoted_attribute(&a.image_url),
                encode_double_quoted_attribute(&a.title)
            );
        }
        let _ = write!(html, "<h4 class=\"annotation-title\">{}</h4>", encode_text(&a.title));
        if !a.kind.is_empty() {
            let _ = write!(html, "<span class=\"annotation-type\">{}</span>", encode_text(&a.kind));
        }
        if !a.description.is_empty() {
            let _ = write!(
                html,
                "<p class=\"annotation-description\">{}</p>",
                encode_text(&a.description)
            );
        }
        if !a.content.is_empty() {
            let _ = write!(
                html,
                "<div class=\"annotation-content\">{}</div>",
                encode_text(&a.content)
            );
        }
        html.push_str("</li>");
    }
    html.push_str("</ul></div>");
    html
}

pub fn render_block(title: &str, annotations: &[Annotation]) -> BlockContent {
    BlockContent {
        title: title.to_string(),
        text: render_annotation_list(annotations, RenderOptions::default()),
        footer: String::new(),
    }
}
