use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::errors::PlannerError;
use crate::plan_text::parse_plan_text;
use crate::planner::Planner;

const MOCK_PLAN: &str =
    "1) Navigate to relevant sites\n2) Extract required data\n3) Validate results and summarize";
const MOCK_ANALYSIS: &str = "User intent identified; constraints and success criteria noted.";
const MOCK_REFLECTION: &str = "Adjust selectors and add waits; retry failed steps.";

/// Deterministic planner used offline and in tests.
///
/// URLs in the goal become `open(...)` steps and a mention of extracting or a
/// title adds `extract("title")`; anything else gets a canned plan.
#[derive(Debug, Default)]
pub struct MockPlanner {
    plans: AtomicUsize,
    replans: AtomicUsize,
}

impl MockPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan_calls(&self) -> usize {
        self.plans.load(Ordering::SeqCst)
    }

    pub fn replan_calls(&self) -> usize {
        self.replans.load(Ordering::SeqCst)
    }

    fn steps_for(goal: &str) -> Vec<String> {
        let mut steps: Vec<String> = goal
            .split_whitespace()
            .map(|token| token.trim_end_matches(|c: char| matches!(c, ',' | ';' | ')' | '"' | '\'')))
            .map(|token| token.trim_start_matches(|c: char| matches!(c, '(' | '"' | '\'')))
            .filter(|token| token.starts_with("http://") || token.starts_with("https://"))
            .map(|url| format!("open(\"{}\")", url.trim_end_matches('.')))
            .collect();
        let lower = goal.to_lowercase();
        if lower.contains("extract") || lower.contains("title") {
            steps.push("extract(\"title\")".to_string());
        }
        if steps.is_empty() {
            return parse_plan_text(MOCK_PLAN);
        }
        steps
    }
}

#[async_trait]
impl Planner for MockPlanner {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn analyze(&self, goal: &str, _context: &str) -> Result<String, PlannerError> {
        ensure_goal(goal)?;
        Ok(MOCK_ANALYSIS.to_string())
    }

    async fn plan(&self, goal: &str, _context: &str) -> Result<Vec<String>, PlannerError> {
        ensure_goal(goal)?;
        self.plans.fetch_add(1, Ordering::SeqCst);
        Ok(Self::steps_for(goal))
    }

    async fn reflect(
        &self,
        _last_plan: &[String],
        _observation: &str,
    ) -> Result<String, PlannerError> {
        self.replans.fetch_add(1, Ordering::SeqCst);
        Ok(MOCK_REFLECTION.to_string())
    }
}

pub(crate) fn ensure_goal(goal: &str) -> Result<(), PlannerError> {
    if goal.trim().is_empty() {
        return Err(PlannerError::invalid_request("goal must not be empty"));
    }
    Ok(())
}
