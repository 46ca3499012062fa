//! Plain-text and URL cleaning for untrusted annotation fields.
//!
//! Remote payloads are treated as plain text: markup is removed here, and the
//! renderer HTML-escapes whatever remains on output.

use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[a-zA-Z!/][^>]*>").expect("valid regex"));

/// Strip markup and control characters, returning trimmed plain text.
///
/// `<script>` and `<style>` elements are removed together with their body;
/// any other tag is removed but its text is kept. Newlines and tabs survive.
pub fn clean_text(input: &str) -> String {
    let text = SCRIPT_RE.replace_all(input, "");
    let text = STYLE_RE.replace_all(&text, "");
    let text = COMMENT_RE.replace_all(&text, "");
    let text = TAG_RE.replace_all(&text, "");

    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Return `input` (trimmed) when it is an absolute http(s) URL, else `""`.
pub fn clean_url(input: &str) -> String {
    let candidate = input.trim();
    if candidate.is_empty()
        || candidate
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
    {
        return String::new();
    }

    match Url::parse(candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            candidate.to_string()
        }
        _ => String::new(),
    }
}
