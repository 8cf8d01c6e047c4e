// Search tool: Google results through SerpAPI

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

use super::gemini::FunctionDeclaration;
use super::Tool;
use crate::error::DelegateError;

pub const SEARCH_TOOL_NAME: &str = "search_google";

pub struct SerpApiSearch {
    http: Client,
    base_url: String,
    api_key: String,
    default_results: u32,
}

impl SerpApiSearch {
    pub fn new(http: Client, base_url: &str, api_key: &str, default_results: u32) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            default_results,
        }
    }

    pub async fn search_google(&self, query: &str, num_results: u32) -> Result<Value, DelegateError> {
        info!("Search: querying Google for: {}", query);

        let num = num_results.to_string();
        let response = self
            .http
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.failure(e.without_url().to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| self.failure(format!("unreadable response ({}): {}", status, e.without_url())))?;

        if let Some(message) = body.get("error").and_then(Value::as_str) {
            return Err(self.failure(message.to_string()));
        }
        if !status.is_success() {
            return Err(self.failure(format!("HTTP {}", status)));
        }

        Ok(condense(&body, num_results as usize))
    }

    fn failure(&self, message: String) -> DelegateError {
        DelegateError::Tool {
            tool: SEARCH_TOOL_NAME.to_string(),
            message,
        }
    }
}

/// Keeps the parts of a SerpAPI payload worth spending model tokens on.
fn condense(body: &Value, limit: usize) -> Value {
    let results: Vec<Value> = body
        .get("organic_results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(limit)
                .map(|item| {
                    json!({
                        "position": item.get("position"),
                        "title": item.get("title"),
                        "link": item.get("link"),
                        "snippet": item.get("snippet"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let mut condensed = json!({ "search_results": results });
    for key in ["knowledge_graph", "related_questions"] {
        if let Some(value) = body.get(key) {
            condensed[key] = value.clone();
        }
    }
    condensed
}

#[async_trait]
impl Tool for SerpApiSearch {
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: SEARCH_TOOL_NAME.to_string(),
            description: "Search Google for a query and return the top organic results \
                          with title, link and snippet."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    },
                    "num_results": {
                        "type": "integer",
                        "description": "How many results to return"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: &Value) -> Result<Value, DelegateError> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| self.failure("missing 'query' argument".to_string()))?;
        let num_results = args
            .get("num_results")
            .and_then(Value::as_u64)
            .map(|n| n.clamp(1, 100) as u32)
            .unwrap_or(self.default_results);

        self.search_google(query, num_results).await
    }
}
