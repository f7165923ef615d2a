//! OpenAI-compatible chat-completions planner.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::PlannerError;
use crate::mock::ensure_goal;
use crate::plan_text::parse_plan_text;
use crate::planner::{Planner, PlannerConfig};

const PLAN_SYSTEM: &str = "You produce ordered, concise web-automation steps. \
Use one action per line from: open(url), click(\"label or selector\"), \
type(\"text\", \"field\"), wait(ms), scroll(px), extract(\"selector\"), \
upload(\"selector\", \"filepath\"), new_tab(url), switch_tab(n).";
const ANALYZE_SYSTEM: &str = "You analyze tasks for a web automation agent.";
const REFLECT_SYSTEM: &str = "You provide brief, actionable improvements to the plan.";

pub struct HttpPlanner {
    client: Client,
    config: PlannerConfig,
    api_key: String,
}

impl HttpPlanner {
    pub fn new(config: PlannerConfig) -> Result<Self, PlannerError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PlannerError::invalid_request("missing API key for planner"))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| {
                PlannerError::invalid_request(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    async fn complete(&self, system: &str, user: String) -> Result<String, PlannerError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| PlannerError::unavailable(format!("request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            warn!(%status, "planner request rejected");
            return Err(PlannerError::unavailable(format!("{status}: {text}")));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| PlannerError::InvalidResponse(err.to_string()))?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!(model = %self.config.model, chars = content.len(), "planner completion");
        Ok(content)
    }
}

#[async_trait]
impl Planner for HttpPlanner {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn analyze(&self, goal: &str, context: &str) -> Result<String, PlannerError> {
        ensure_goal(goal)?;
        self.complete(ANALYZE_SYSTEM, format!("Analyze: goal= {goal}\nContext: {context}"))
            .await
    }

    async fn plan(&self, goal: &str, context: &str) -> Result<Vec<String>, PlannerError> {
        ensure_goal(goal)?;
        let text = self
            .complete(
                PLAN_SYSTEM,
                format!("Plan: goal= {goal}\nContext: {context}\nOutput numbered short steps."),
            )
            .await?;
        Ok(parse_plan_text(&text))
    }

    async fn reflect(
        &self,
        last_plan: &[String],
        observation: &str,
    ) -> Result<String, PlannerError> {
        self.complete(
            REFLECT_SYSTEM,
            format!("Reflect: plan= {last_plan:?}\nObservation: {observation}"),
        )
        .await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
