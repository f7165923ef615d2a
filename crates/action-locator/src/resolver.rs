//! Target resolvers: a plain CSS resolver and the five-stage fallback chain

use std::collections::HashSet;

use action_primitives::Primitives;
use async_trait::async_trait;
use cdp_adapter::{CandidateScope, Locator, PageSurface};
use memory_center::SharedSelectorMemory;
use perceiver_semantic::SemanticResolver;
use tracing::{debug, info, warn};
use webpilot_core_types::{origin_of, ActionKind};

use crate::{
    errors::LocatorError,
    types::{Resolution, Stage, TargetOp},
};

/// How many cached descriptors to try before moving on.
pub const MEMORY_CANDIDATES: usize = 5;
/// Upper bound on live elements fed to the semantic ranker.
pub const SEMANTIC_CANDIDATES: usize = 200;

/// Finds the element named by `target` and performs `op` on it.
///
/// The variant is picked once when the executor is built.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn perform(
        &self,
        surface: &dyn PageSurface,
        target: &str,
        op: TargetOp<'_>,
    ) -> Result<Resolution, LocatorError>;

    fn name(&self) -> &'static str;
}

async fn attempt(
    primitives: &Primitives,
    surface: &dyn PageSurface,
    locator: &Locator,
    op: TargetOp<'_>,
) -> bool {
    let result = match op {
        TargetOp::Click => primitives.click(surface, locator).await,
        TargetOp::Fill(text) => primitives.fill(surface, locator, text).await,
    };
    match result {
        Ok(_) => true,
        Err(err) => {
            debug!(descriptor = %locator.to_descriptor(), error = %err, "locator attempt failed");
            false
        }
    }
}

/// Treats the target as a CSS selector and nothing else.
#[derive(Clone, Debug, Default)]
pub struct DirectResolver {
    primitives: Primitives,
}

impl DirectResolver {
    pub fn new(primitives: Primitives) -> Self {
        Self { primitives }
    }
}

#[async_trait]
impl TargetResolver for DirectResolver {
    async fn perform(
        &self,
        surface: &dyn PageSurface,
        target: &str,
        op: TargetOp<'_>,
    ) -> Result<Resolution, LocatorError> {
        let locator = Locator::css(target);
        if attempt(&self.primitives, surface, &locator, op).await {
            return Ok(Resolution {
                descriptor: locator.to_descriptor(),
                stage: Stage::Literal,
                attempted: Vec::new(),
            });
        }
        Err(LocatorError::ResolutionExhausted {
            target: target.to_string(),
            attempted: vec![locator.to_descriptor()],
        })
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

/// Memory, literal CSS, role/placeholder/label, semantic ranking, visible text.
///
/// Only cached descriptors get the retry policy; every later stage is tried
/// once so a missing target does not pay the full backoff at each stage.
pub struct FallbackChain {
    primitives: Primitives,
    probing: Primitives,
    memory: SharedSelectorMemory,
}

impl FallbackChain {
    pub fn new(primitives: Primitives, memory: SharedSelectorMemory) -> Self {
        Self {
            probing: primitives.without_retry(),
            primitives,
            memory,
        }
    }

    fn structural(kind: ActionKind, label: &str) -> Vec<Locator> {
        match kind {
            ActionKind::Type => vec![
                Locator::Placeholder(label.to_string()),
                Locator::Label(label.to_string()),
            ],
            _ => vec![Locator::button(label)],
        }
    }

    /// Label of the live element closest to `target`, if any scores above zero.
    async fn semantic_label(
        &self,
        surface: &dyn PageSurface,
        kind: ActionKind,
        target: &str,
    ) -> Option<String> {
        let scope = match kind {
            ActionKind::Type => CandidateScope::Editable,
            _ => CandidateScope::Actionable,
        };
        let candidates = match surface.candidates(scope, SEMANTIC_CANDIDATES).await {
            Ok(candidates) => candidates,
            Err(err) => {
                debug!(error = %err, "candidate enumeration failed");
                return None;
            }
        };
        let usable: Vec<_> = candidates
            .into_iter()
            .filter(|candidate| !candidate.document().is_empty())
            .collect();
        let mut resolver = SemanticResolver::new();
        resolver.index(usable.iter().map(|candidate| candidate.document()));
        let best = resolver.best(target)?;
        let label = usable.get(best.index)?.label()?;
        debug!(target, label = %label, score = best.score, "semantic candidate");
        Some(label)
    }

    async fn try_stage(
        &self,
        surface: &dyn PageSurface,
        stage: Stage,
        locators: Vec<Locator>,
        op: TargetOp<'_>,
        tried: &mut Vec<String>,
        seen: &mut HashSet<Locator>,
    ) -> Option<Resolution> {
        let primitives = match stage {
            Stage::Memory => &self.primitives,
            _ => &self.probing,
        };
        for locator in locators {
            if !seen.insert(locator.clone()) {
                continue;
            }
            let descriptor = locator.to_descriptor();
            if attempt(primitives, surface, &locator, op).await {
                return Some(Resolution {
                    descriptor,
                    stage,
                    attempted: std::mem::take(tried),
                });
            }
            tried.push(descriptor);
        }
        None
    }
}

#[async_trait]
impl TargetResolver for FallbackChain {
    async fn perform(
        &self,
        surface: &dyn PageSurface,
        target: &str,
        op: TargetOp<'_>,
    ) -> Result<Resolution, LocatorError> {
        let kind = op.action_kind();
        let origin = match surface.current_url().await {
            Ok(url) => origin_of(&url).ok(),
            Err(err) => {
                debug!(error = %err, "current url unavailable, memory disabled");
                None
            }
        };
        let mut tried = Vec::new();
        let mut seen = HashSet::new();

        let remembered: Vec<Locator> = origin
            .as_deref()
            .map(|origin| self.memory.lookup(origin, kind, target))
            .unwrap_or_default()
            .into_iter()
            .take(MEMORY_CANDIDATES)
            .map(|descriptor| Locator::from_descriptor(&descriptor))
            .collect();

        let mut resolved = self
            .try_stage(surface, Stage::Memory, remembered, op, &mut tried, &mut seen)
            .await;
        if resolved.is_none() {
            resolved = self
                .try_stage(surface, Stage::Literal, vec![Locator::css(target)], op, &mut tried, &mut seen)
                .await;
        }
        if resolved.is_none() {
            resolved = self
                .try_stage(surface, Stage::Structural, Self::structural(kind, target), op, &mut tried, &mut seen)
                .await;
        }
        if resolved.is_none() {
            if let Some(label) = self.semantic_label(surface, kind, target).await {
                let mut locators = Self::structural(kind, &label);
                locators.push(Locator::Text(label));
                resolved = self
                    .try_stage(surface, Stage::Semantic, locators, op, &mut tried, &mut seen)
                    .await;
            }
        }
        if resolved.is_none() {
            resolved = self
                .try_stage(surface, Stage::Text, vec![Locator::Text(target.to_string())], op, &mut tried, &mut seen)
                .await;
        }

        let Some(resolution) = resolved else {
            warn!(target, attempted = ?tried, "all resolution stages failed");
            return Err(LocatorError::ResolutionExhausted {
                target: target.to_string(),
                attempted: tried,
            });
        };

        info!(
            target,
            stage = resolution.stage.name(),
            descriptor = %resolution.descriptor,
            "target resolved"
        );
        if resolution.stage.records_success() {
            if let Some(origin) = origin.as_deref() {
                self.memory
                    .record_success(origin, kind, target, &resolution.descriptor);
            }
        }
        Ok(resolution)
    }

    fn name(&self) -> &'static str {
        "fallback-chain"
    }
}
