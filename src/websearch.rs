use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::WebSearchConfig;
use crate::constants;

/// One web search hit
#[derive(Debug, Clone)]
pub struct WebResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Web search backend. May fail or return empty; callers treat both the same
/// way and degrade to whatever other evidence they have.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>>;
}

/// Create the configured web search provider
pub fn create_web_search_provider(config: &WebSearchConfig) -> Result<Arc<dyn WebSearchProvider>> {
    match config.provider.as_str() {
        "duckduckgo" => Ok(Arc::new(DuckDuckGoSearch::new()?)),
        "stub" => Ok(Arc::new(StubWebSearch::empty())),
        other => anyhow::bail!("Unknown web search provider: {}", other),
    }
}

/// DuckDuckGo search via the HTML endpoint (no API key required)
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(constants::HTTP_TIMEOUT_SECS))
            .user_agent(constants::USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebSearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>> {
        let response = self
            .client
            .get("https://html.duckduckgo.com/html/")
            .query(&[("q", query)])
            .send()
            .await
            .context("Web search request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Web search error: {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("Failed to read web search response")?;

        Ok(parse_result_page(&body, max_results))
    }
}

/// Extract result anchors and snippets from the DuckDuckGo HTML result page.
/// Result links carry class "result__a", snippets class "result__snippet".
fn parse_result_page(html: &str, max_results: usize) -> Vec<WebResult> {
    let mut results = Vec::new();
    let mut cursor = 0;

    while results.len() < max_results {
        let Some(rel) = html[cursor..].find("class=\"result__a\"") else {
            break;
        };
        let class_pos = cursor + rel;

        let tag_start = html[..class_pos].rfind("<a").unwrap_or(class_pos);
        let Some(tag_end_rel) = html[tag_start..].find('>') else {
            break;
        };
        let tag_end = tag_start + tag_end_rel;

        let url = extract_attribute(&html[tag_start..tag_end], "href").unwrap_or_default();

        let Some(close_rel) = html[tag_end..].find("</a>") else {
            break;
        };
        let title = strip_tags(&html[tag_end + 1..tag_end + close_rel]);

        let after_anchor = tag_end + close_rel + "</a>".len();
        let snippet = snippet_after(html, after_anchor);

        if !url.is_empty() && !title.is_empty() {
            results.push(WebResult {
                title,
                snippet,
                url,
            });
        }

        cursor = after_anchor;
    }

    results
}

/// Snippet element immediately following a result anchor, if any
fn snippet_after(html: &str, from: usize) -> String {
    let Some(rel) = html[from..].find("class=\"result__snippet\"") else {
        return String::new();
    };
    let class_pos = from + rel;
    let Some(open_rel) = html[class_pos..].find('>') else {
        return String::new();
    };
    let content_start = class_pos + open_rel + 1;
    let Some(close_rel) = html[content_start..].find("</a>") else {
        return String::new();
    };
    strip_tags(&html[content_start..content_start + close_rel])
}

fn extract_attribute(tag: &str, name: &str) -> Option<String> {
    let marker = format!("{}=\"", name);
    let start = tag.find(&marker)? + marker.len();
    let end = tag[start..].find('"')?;
    Some(tag[start..start + end].to_string())
}

fn strip_tags(fragment: &str) -> String {
    html2text::from_read(fragment.as_bytes(), 200)
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|_| fragment.trim().to_string())
}

/// Canned web search results, or a scripted failure
pub struct StubWebSearch {
    results: Vec<WebResult>,
    fail: bool,
}

impl StubWebSearch {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            fail: false,
        }
    }

    pub fn with_results(results: Vec<WebResult>) -> Self {
        Self {
            results,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl WebSearchProvider for StubWebSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<WebResult>> {
        if self.fail {
            anyhow::bail!("stubbed web search failure");
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}
