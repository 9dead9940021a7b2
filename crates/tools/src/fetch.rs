//! The `read_url` content-fetch tool.
//!
//! Fetch failures are data, not errors: the researcher always receives a
//! string and the graph keeps moving, so a dead link costs one wasted
//! tool round-trip instead of the whole run.

use scraper::{ElementRef, Html, Node, Selector};
use scriptorium_llm::ToolSpec;
use serde_json::json;
use thiserror::Error;
use tracing::info;

/// Name the tool is exposed under to the model.
pub const READ_URL_TOOL: &str = "read_url";

/// Upper bound on returned text, to keep downstream model context in check.
pub const MAX_FETCH_CHARS: usize = 10_000;

/// Markup subtrees dropped before text extraction.
const EXCLUDED_TAGS: &[&str] = &["script", "style", "nav", "footer", "noscript", "template"];

#[derive(Debug, Error)]
enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),
}

pub struct PageFetcher {
    http_client: reqwest::Client,
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFetcher {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }

    /// Schema handed to the model when the tool is bound.
    pub fn tool_spec() -> ToolSpec {
        ToolSpec {
            name: READ_URL_TOOL.to_string(),
            description: "Reads the content of a given URL. Use this when the user provides a link to source material.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL to read"
                    }
                },
                "required": ["url"]
            }),
        }
    }

    /// Fetch a page and return sanitized text. Never fails: network and
    /// parse problems come back as a textual error payload.
    pub async fn fetch(&self, url: &str) -> String {
        info!(url, "Fetching URL content");
        match self.try_fetch(url).await {
            Ok(text) => text,
            Err(e) => format!("Error reading {url}: {e}"),
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let html = response.text().await?;
        Ok(sanitize(&html))
    }
}

/// Strip non-content markup, collapse whitespace, and truncate.
/// Deterministic: the same document always yields the same text.
pub fn sanitize(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut raw = String::new();
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next());
    match body {
        Some(element) => collect_text(element, &mut raw),
        None => collect_text(document.root_element(), &mut raw),
    }

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, MAX_FETCH_CHARS)
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if !EXCLUDED_TAGS.contains(&el.name()) {
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        collect_text(child_ref, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head><title>Ignored</title><style>body { color: red; }</style></head>
          <body>
            <nav>Home About Contact</nav>
            <script>console.log("tracking");</script>
            <article>
              <h1>WebGPU   in   production</h1>
              <p>Compute shaders for the rest of us.</p>
            </article>
            <footer>Copyright 2026</footer>
          </body>
        </html>
    "#;

    #[test]
    fn strips_script_style_nav_footer() {
        let text = sanitize(PAGE);
        assert!(text.contains("WebGPU in production"));
        assert!(text.contains("Compute shaders"));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("Home About"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn collapses_whitespace_runs() {
        let text = sanitize(PAGE);
        assert!(!text.contains("  "));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn sanitization_is_deterministic() {
        assert_eq!(sanitize(PAGE), sanitize(PAGE));
    }

    #[test]
    fn long_body_truncates_to_exactly_the_cap() {
        let body: String = "word ".repeat(5000);
        let html = format!("<html><body><p>{body}</p></body></html>");
        let text = sanitize(&html);
        assert_eq!(text.chars().count(), MAX_FETCH_CHARS);
    }

    #[test]
    fn short_body_passes_through_unclipped() {
        let html = "<html><body><p>just a few words</p></body></html>";
        assert_eq!(sanitize(html), "just a few words");
    }

    #[test]
    fn tool_spec_declares_url_parameter() {
        let spec = PageFetcher::tool_spec();
        assert_eq!(spec.name, READ_URL_TOOL);
        assert_eq!(spec.parameters["required"][0], "url");
    }

    #[tokio::test]
    async fn unreachable_host_becomes_textual_payload() {
        let fetcher = PageFetcher::new();
        let result = fetcher.fetch("http://127.0.0.1:1/nothing-here").await;
        assert!(result.starts_with("Error reading http://127.0.0.1:1/nothing-here:"));
    }
}
