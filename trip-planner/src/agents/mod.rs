pub mod agent;
pub mod gemini;
pub mod planner;
pub mod researcher;
pub mod search;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ApiError, DelegateError};
use crate::models::TravelProfile;
use gemini::{FunctionDeclaration, GeminiClient};
use search::SerpApiSearch;

/// A configured model role: prompt text in, free text out.
#[async_trait]
pub trait Delegate: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, DelegateError>;
}

/// A function the hosted model may call while answering.
#[async_trait]
pub trait Tool: Send + Sync {
    fn declaration(&self) -> FunctionDeclaration;

    async fn call(&self, args: &Value) -> Result<Value, DelegateError>;
}

/// The two stage delegates for one submission.
pub struct Delegates {
    pub researcher: Box<dyn Delegate>,
    pub planner: Box<dyn Delegate>,
}

/// Builds the delegates for a submission once its credentials are known.
pub trait DelegateFactory: Send + Sync {
    fn build(&self, credentials: &Credentials, profile: &TravelProfile) -> Delegates;
}

#[derive(Clone)]
pub struct Credentials {
    model_api_key: String,
    search_api_key: String,
}

impl Credentials {
    /// Form values win; the model key falls back to the configured one.
    pub fn resolve(
        form_model_key: Option<&str>,
        form_search_key: Option<&str>,
        fallback_model_key: Option<&str>,
    ) -> Result<Self, ApiError> {
        fn present(key: Option<&str>) -> Option<&str> {
            key.map(str::trim).filter(|k| !k.is_empty())
        }

        let model_api_key = present(form_model_key)
            .or(present(fallback_model_key))
            .ok_or(ApiError::MissingCredential("Google API Key"))?;
        let search_api_key =
            present(form_search_key).ok_or(ApiError::MissingCredential("SerpAPI Key"))?;

        Ok(Self {
            model_api_key: model_api_key.to_string(),
            search_api_key: search_api_key.to_string(),
        })
    }

    pub fn model_api_key(&self) -> &str {
        &self.model_api_key
    }

    pub fn search_api_key(&self) -> &str {
        &self.search_api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("model_api_key", &"<redacted>")
            .field("search_api_key", &"<redacted>")
            .finish()
    }
}

/// Production factory: Gemini for both roles, SerpAPI search for the researcher.
pub struct GeminiDelegateFactory {
    http: reqwest::Client,
    config: Config,
}

impl GeminiDelegateFactory {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }
}

impl DelegateFactory for GeminiDelegateFactory {
    fn build(&self, credentials: &Credentials, profile: &TravelProfile) -> Delegates {
        let model = GeminiClient::new(
            self.http.clone(),
            &self.config.gemini_base_url,
            &self.config.gemini_model,
            credentials.model_api_key(),
        );
        let search: Arc<dyn Tool> = Arc::new(SerpApiSearch::new(
            self.http.clone(),
            &self.config.serpapi_base_url,
            credentials.search_api_key(),
            self.config.search_results,
        ));

        Delegates {
            researcher: Box::new(researcher::build(
                model.clone(),
                search,
                profile,
                self.config.max_tool_rounds,
            )),
            planner: Box::new(planner::build(model)),
        }
    }
}
