// Agent: a hosted model wrapped with a role, standing instructions and optional tools

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::gemini::{Content, FunctionResponse, GeminiClient};
use super::{Delegate, Tool};
use crate::error::DelegateError;

pub struct Agent {
    name: String,
    role: String,
    description: String,
    instructions: Vec<String>,
    add_datetime: bool,
    model: GeminiClient,
    tools: Vec<Arc<dyn Tool>>,
    max_tool_rounds: usize,
}

impl Agent {
    pub fn new(name: &str, role: &str, model: GeminiClient) -> Self {
        Self {
            name: name.to_string(),
            role: role.to_string(),
            description: String::new(),
            instructions: Vec::new(),
            add_datetime: false,
            model,
            tools: Vec::new(),
            max_tool_rounds: 8,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions = instructions.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_datetime_to_instructions(mut self, enabled: bool) -> Self {
        self.add_datetime = enabled;
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    #[cfg(test)]
    pub fn role(&self) -> &str {
        &self.role
    }

    #[cfg(test)]
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.declaration().name).collect()
    }

    pub fn system_instruction(&self, now: DateTime<Local>) -> String {
        let mut sections = Vec::new();

        if !self.description.trim().is_empty() {
            sections.push(self.description.trim().to_string());
        }
        sections.push(format!("Your role is: {}", self.role));

        let mut instructions = self.instructions.clone();
        if self.add_datetime {
            instructions.push(format!(
                "The current date and time is {}.",
                now.format("%Y-%m-%d %H:%M:%S %Z")
            ));
        }
        if !instructions.is_empty() {
            let list = instructions
                .iter()
                .map(|line| format!("- {}", line))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("Instructions:\n{}", list));
        }

        sections.join("\n\n")
    }

    async fn run_tool(&self, name: &str, args: &serde_json::Value) -> Result<FunctionResponse, DelegateError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.declaration().name == name)
            .ok_or_else(|| DelegateError::UnknownTool(name.to_string()))?;

        info!("{}: calling tool {}", self.name, name);
        let output = tool.call(args).await?;

        Ok(FunctionResponse {
            name: name.to_string(),
            response: json!({ "content": output }),
        })
    }
}

#[async_trait]
impl Delegate for Agent {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, prompt), fields(agent = %self.name, model = %self.model.model()))]
    async fn generate(&self, prompt: &str) -> Result<String, DelegateError> {
        let system = Content::system(self.system_instruction(Local::now()));
        let declarations: Vec<_> = self.tools.iter().map(|t| t.declaration()).collect();
        let mut contents = vec![Content::user(prompt)];

        for round in 0..=self.max_tool_rounds {
            let reply = self
                .model
                .generate_content(Some(&system), &contents, &declarations)
                .await?;

            let calls: Vec<_> = reply.function_calls().into_iter().cloned().collect();
            if calls.is_empty() {
                let text = reply.joined_text();
                if text.trim().is_empty() {
                    return Err(DelegateError::EmptyResponse("reply had no text".into()));
                }
                info!("{}: answered after {} tool round(s)", self.name, round);
                return Ok(text);
            }

            if round == self.max_tool_rounds {
                break;
            }

            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                responses.push(self.run_tool(&call.name, &call.args).await?);
            }
            contents.push(reply);
            contents.push(Content::function_responses(responses));
        }

        warn!("{}: gave up after {} tool rounds", self.name, self.max_tool_rounds);
        Err(DelegateError::ToolRoundsExceeded(self.max_tool_rounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::gemini::FunctionDeclaration;
    use chrono::TimeZone;
    use serde_json::Value;
    use std::sync::Mutex;
    use warp::Filter;

    /// Fake search tool that records the queries it was given.
    #[derive(Default)]
    struct EchoSearch {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Tool for EchoSearch {
        fn declaration(&self) -> FunctionDeclaration {
            FunctionDeclaration {
                name: "search_google".into(),
                description: "test search".into(),
                parameters: json!({ "type": "object" }),
            }
        }

        async fn call(&self, args: &Value) -> Result<Value, DelegateError> {
            let query = args["query"].as_str().unwrap_or_default().to_string();
            self.queries.lock().unwrap().push(query.clone());
            Ok(json!([{ "title": format!("result for {}", query) }]))
        }
    }

    /// Mock Gemini: asks for one search per round until it has seen
    /// `searches` function responses, then answers with text.
    async fn mock_gemini(searches: usize, bodies: Arc<Mutex<Vec<Value>>>) -> String {
        let route = warp::post()
            .and(warp::path!("v1beta" / "models" / String))
            .and(warp::header::<String>("x-goog-api-key"))
            .and(warp::body::json())
            .map(move |model: String, key: String, body: Value| {
                assert!(model.ends_with(":generateContent"));
                assert_eq!(key, "test-key");
                bodies.lock().unwrap().push(body.clone());

                let answered = body["contents"]
                    .as_array()
                    .map(|c| c.iter().filter(|turn| turn["parts"][0].get("functionResponse").is_some()).count())
                    .unwrap_or(0);
                let part = if answered < searches {
                    json!({ "functionCall": { "name": "search_google", "args": { "query": format!("q{}", answered + 1) } } })
                } else {
                    json!({ "text": format!("summary after {} searches", answered) })
                };
                warp::reply::json(&json!({
                    "candidates": [{ "content": { "role": "model", "parts": [part] }, "finishReason": "STOP" }]
                }))
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        format!("http://{}", addr)
    }

    fn client(base: &str) -> GeminiClient {
        GeminiClient::new(reqwest::Client::new(), base, "gemini-test", "test-key")
    }

    #[tokio::test]
    async fn tool_calls_loop_until_text_answer() {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let base = mock_gemini(3, bodies.clone()).await;
        let search = Arc::new(EchoSearch::default());
        let agent = Agent::new("Researcher", "Travel search expert", client(&base))
            .description("You are a travel researcher.")
            .tool(search.clone());

        let text = agent.generate("Plan a trip").await.unwrap();

        assert_eq!(text, "summary after 3 searches");
        assert_eq!(*search.queries.lock().unwrap(), vec!["q1", "q2", "q3"]);

        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies.len(), 4);
        assert_eq!(bodies[0]["contents"][0]["parts"][0]["text"], "Plan a trip");
        assert_eq!(bodies[0]["tools"][0]["functionDeclarations"][0]["name"], "search_google");
        let system = bodies[0]["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(system.starts_with("You are a travel researcher."));
        // every round resends the whole conversation
        assert_eq!(bodies[3]["contents"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn runaway_tool_use_is_cut_off() {
        let base = mock_gemini(usize::MAX, Arc::new(Mutex::new(Vec::new()))).await;
        let agent = Agent::new("Researcher", "r", client(&base))
            .tool(Arc::new(EchoSearch::default()))
            .max_tool_rounds(2);

        assert!(matches!(
            agent.generate("go").await,
            Err(DelegateError::ToolRoundsExceeded(2))
        ));
    }

    #[tokio::test]
    async fn unknown_tool_fails_the_call() {
        let base = mock_gemini(1, Arc::new(Mutex::new(Vec::new()))).await;
        let agent = Agent::new("Planner", "p", client(&base));

        assert!(matches!(
            agent.generate("go").await,
            Err(DelegateError::UnknownTool(name)) if name == "search_google"
        ));
    }

    #[tokio::test]
    async fn tool_free_agent_sends_no_tools() {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let base = mock_gemini(0, bodies.clone()).await;
        let agent = Agent::new("Planner", "Travel itinerary generator", client(&base));

        assert_eq!(agent.generate("itinerary please").await.unwrap(), "summary after 0 searches");
        assert!(bodies.lock().unwrap()[0].get("tools").is_none());
    }

    #[test]
    fn system_instruction_lists_role_instructions_and_time() {
        let agent = Agent::new("Planner", "Travel itinerary generator", client("http://localhost"))
            .description("You are an expert travel planner.")
            .instructions(["Be realistic.", "Be engaging."])
            .add_datetime_to_instructions(true);
        let now = Local.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();

        let text = agent.system_instruction(now);

        assert!(text.starts_with("You are an expert travel planner.\n\nYour role is: Travel itinerary generator"));
        assert!(text.contains("Instructions:\n- Be realistic.\n- Be engaging.\n- The current date and time is 2026-03-14 09:30:00"));
    }

    #[test]
    fn datetime_is_opt_in() {
        let agent = Agent::new("A", "r", client("http://localhost")).instructions(["Only this."]);
        let text = agent.system_instruction(Local::now());
        assert!(!text.contains("current date and time"));
        assert!(text.ends_with("- Only this."));
    }
}
