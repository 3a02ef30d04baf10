//! 搜索工具：Tavily 网页搜索
//!
//! POST 查询到 Tavily，返回前 max_results 条结果（title / url / content / score）的 JSON 文本。
//! 片段像 HTML 时用 html2text 提取可读文本；整体超过 max_result_chars 时截断并追加 ...[truncated]。
//! 失败策略为 Observe：错误文本交回给决策模型。

use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::SearchSection;
use crate::core::ToolError;
use crate::tools::{FailurePolicy, Tool, ToolKind};

/// Tavily 请求体
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// 单条搜索结果；同时是交回给模型的格式
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
}

pub struct SearchTool {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    max_results: usize,
    max_result_chars: usize,
}

/// 判断内容是否像 HTML（需提取可读文本）
fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!")
        || s.to_lowercase().starts_with("<html")
        || (s.contains('<') && (s.contains("</") || s.contains("<br") || s.contains("<p>")))
}

fn html_to_text(html: &str) -> String {
    match from_read(html.as_bytes(), 120) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => html.to_string(),
    }
}

/// 清洗结果片段并序列化为 JSON 文本，超长截断
pub fn render_hits(hits: Vec<SearchHit>, max_chars: usize) -> String {
    let hits: Vec<SearchHit> = hits
        .into_iter()
        .map(|mut h| {
            if looks_like_html(&h.content) {
                h.content = html_to_text(&h.content);
            }
            h
        })
        .collect();
    let body = serde_json::to_string(&hits).unwrap_or_else(|_| "[]".to_string());
    if body.chars().count() > max_chars {
        body.chars().take(max_chars).collect::<String>() + "\n...[truncated]"
    } else {
        body
    }
}

impl SearchTool {
    pub fn new(cfg: &SearchSection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: cfg.endpoint.clone(),
            api_key: std::env::var("TAVILY_API_KEY").ok().filter(|k| !k.is_empty()),
            max_results: cfg.max_results,
            max_result_chars: cfg.max_result_chars,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ToolError::MissingCredentials("TAVILY_API_KEY"))?;
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&SearchRequest {
                query,
                max_results: self.max_results,
            })
            .send()
            .await
            .map_err(|e| ToolError::Request(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::Request(format!("HTTP {}: {}", status, body)));
        }
        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| ToolError::Decode(e.to_string()))?;
        let mut hits = parsed.results;
        hits.truncate(self.max_results);
        Ok(hits)
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Search
    }

    fn description(&self) -> &str {
        "A search engine for current events and live information. Input should be a search query."
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Observe
    }

    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("empty search query".to_string()));
        }
        tracing::info!(query = %query, "search tool query");
        let hits = self.search(query).await?;
        Ok(render_hits(hits, self.max_result_chars))
    }
}
