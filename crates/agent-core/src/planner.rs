use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::PlannerError;
use crate::http::HttpPlanner;
use crate::mock::MockPlanner;

/// Planner collaborator: turns a goal into ordered textual steps.
#[async_trait]
pub trait Planner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze(&self, goal: &str, context: &str) -> Result<String, PlannerError>;

    async fn plan(&self, goal: &str, context: &str) -> Result<Vec<String>, PlannerError>;

    /// Short critique of `last_plan` given the failure just observed.
    async fn reflect(&self, last_plan: &[String], observation: &str)
        -> Result<String, PlannerError>;

    /// Reflects, then plans again with the failure folded into the context.
    async fn replan(
        &self,
        goal: &str,
        context: &str,
        last_plan: &[String],
        observation: &str,
    ) -> Result<Vec<String>, PlannerError> {
        let reflection = self.reflect(last_plan, observation).await?;
        info!(planner = self.name(), reflection = %reflection, "replanning");
        let augmented = format!("{context}\nObservation:{observation}");
        self.plan(goal, &augmented).await
    }
}

pub type SharedPlanner = Arc<dyn Planner>;

/// Settings for the OpenAI-compatible planner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            temperature: 0.2,
            timeout_ms: 30_000,
        }
    }
}

impl PlannerConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

/// HTTP planner when an API key is configured, the mock planner otherwise.
pub fn build_planner(cfg: &PlannerConfig) -> Result<SharedPlanner, PlannerError> {
    let planner: SharedPlanner = if cfg.has_api_key() {
        Arc::new(HttpPlanner::new(cfg.clone())?)
    } else {
        Arc::new(MockPlanner::new())
    };
    info!(provider = planner.name(), "planner selected");
    Ok(planner)
}
