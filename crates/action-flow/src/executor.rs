//! ActionExecutor: performs one parsed action against a leased surface

use std::path::Path;
use std::sync::Arc;

use action_locator::{DirectResolver, FallbackChain, TargetOp, TargetResolver};
use action_primitives::{pause, Primitives};
use cdp_adapter::PageSurface;
use memory_center::SharedSelectorMemory;
use permissions_broker::{PermissionCheck, PermissionKind};
use tracing::{debug, error, info, warn};
use webpilot_core_types::grammar::{
    DEFAULT_CLICK_TARGET, DEFAULT_EXTRACT_TARGET, DEFAULT_NAVIGATE_URL, DEFAULT_NEW_TAB_URL,
    DEFAULT_SCROLL_PX, DEFAULT_TYPE_FIELD, DEFAULT_UPLOAD_TARGET, DEFAULT_WAIT_MS,
};
use webpilot_core_types::{parse_action, Action, ActionKind};
use webpilot_policy_center::SecurityGate;

use crate::errors::ExecError;
use crate::types::{ExecutorConfig, ResolverKind};

/// Executes actions and renders their observation strings.
pub struct ActionExecutor {
    gate: Arc<SecurityGate>,
    permissions: Arc<dyn PermissionCheck>,
    primitives: Primitives,
    resolver: Arc<dyn TargetResolver>,
}

impl ActionExecutor {
    /// Builds the executor, choosing the target resolver once from `cfg`.
    pub fn new(
        gate: Arc<SecurityGate>,
        permissions: Arc<dyn PermissionCheck>,
        memory: SharedSelectorMemory,
        cfg: &ExecutorConfig,
    ) -> Self {
        let primitives = Primitives::new(cfg.timeouts.clone(), cfg.retry.clone());
        let resolver: Arc<dyn TargetResolver> = match cfg.resolver {
            ResolverKind::FallbackChain => {
                Arc::new(FallbackChain::new(primitives.clone(), memory))
            }
            ResolverKind::Direct => Arc::new(DirectResolver::new(primitives.clone())),
        };
        debug!(resolver = resolver.name(), "action executor ready");
        Self {
            gate,
            permissions,
            primitives,
            resolver,
        }
    }

    pub fn resolver_name(&self) -> &'static str {
        self.resolver.name()
    }

    pub fn gate(&self) -> &Arc<SecurityGate> {
        &self.gate
    }

    /// Parses `step` with the action grammar; unparsable steps are a no-op.
    pub async fn execute_step(
        &self,
        surface: &dyn PageSurface,
        step: &str,
    ) -> Result<String, ExecError> {
        match parse_action(step) {
            Some(action) => self.execute(surface, &action).await,
            None => {
                debug!(step, "not an action, skipping");
                Ok(format!("noop:{step}"))
            }
        }
    }

    pub async fn execute(
        &self,
        surface: &dyn PageSurface,
        action: &Action,
    ) -> Result<String, ExecError> {
        debug!(action = %action, handle = %surface.id(), "executing");
        match action.kind {
            ActionKind::Navigate => {
                let url = action.primary_or(DEFAULT_NAVIGATE_URL);
                self.admit_navigation(url)?;
                self.primitives.navigate(surface, url).await?;
                Ok(format!("navigated:{url}"))
            }
            ActionKind::Click => {
                let target = action.primary_or(DEFAULT_CLICK_TARGET);
                self.resolver
                    .perform(surface, target, TargetOp::Click)
                    .await?;
                Ok(format!("clicked:{target}"))
            }
            ActionKind::Type => {
                let field = action.secondary_or(DEFAULT_TYPE_FIELD);
                let text = self.gate.sanitize(action.primary_or(""));
                self.resolver
                    .perform(surface, field, TargetOp::Fill(&text))
                    .await?;
                Ok(format!("typed:{text} into:{field}"))
            }
            ActionKind::Wait => {
                let millis = action.number.unwrap_or(DEFAULT_WAIT_MS);
                pause(millis).await;
                Ok(format!("waited_ms:{millis}"))
            }
            ActionKind::Scroll => {
                let pixels = action.number.unwrap_or(DEFAULT_SCROLL_PX);
                if let Err(err) = surface.scroll_by(pixels).await {
                    error!(pixels, error = %err, "scroll failed");
                }
                Ok(format!("scrolled:{pixels}"))
            }
            ActionKind::Extract => {
                let selector = action.primary_or(DEFAULT_EXTRACT_TARGET);
                let text = match self.primitives.read_text(surface, selector).await {
                    Ok(text) => text,
                    Err(err) if err.is_timeout() => {
                        error!(selector, "timeout extracting selector");
                        String::new()
                    }
                    Err(err) => return Err(err.into()),
                };
                info!(selector, chars = text.len(), "extracted text");
                Ok(format!("extract:{selector}:{text}"))
            }
            ActionKind::Upload => {
                if !self.permissions.check(PermissionKind::Upload.as_str()) {
                    return Err(ExecError::NotPermitted("upload".into()));
                }
                let selector = action.primary_or(DEFAULT_UPLOAD_TARGET);
                let path = action.secondary_or("");
                let exists = !path.is_empty()
                    && tokio::fs::try_exists(path).await.unwrap_or(false);
                if !exists {
                    return Err(ExecError::NotFound(format!("upload source {path}")));
                }
                self.primitives
                    .upload(surface, selector, Path::new(path))
                    .await?;
                Ok(format!("uploaded:{path} into:{selector}"))
            }
            ActionKind::NewTab => {
                let url = action.primary_or(DEFAULT_NEW_TAB_URL);
                if url != DEFAULT_NEW_TAB_URL {
                    self.admit_navigation(url)?;
                }
                surface
                    .open_tab(url, self.primitives.timeouts().navigation())
                    .await?;
                info!(url, "new tab opened");
                Ok(format!("new_tab:{url}"))
            }
            ActionKind::SwitchTab => {
                let index = action.number.unwrap_or(0);
                let switched = match usize::try_from(index) {
                    Ok(idx) => surface.switch_tab(idx).await?,
                    Err(_) => false,
                };
                if switched {
                    info!(index, "switched tab");
                } else {
                    error!(index, "switch_tab index out of range");
                }
                Ok(format!("switched_tab:{index}"))
            }
        }
    }

    /// Allowlist (or an off-allowlist grant), then one rate token.
    fn admit_navigation(&self, url: &str) -> Result<(), ExecError> {
        if !self.gate.is_origin_allowed(url) {
            if !self.permissions.check(PermissionKind::OffAllowlist.as_str()) {
                return Err(ExecError::PolicyDenied(format!(
                    "navigation blocked by security policy: {url}"
                )));
            }
            warn!(url, "off-allowlist navigation approved by permission policy");
        }
        if !self.gate.enforce_rate(url) {
            return Err(ExecError::PolicyDenied(format!(
                "rate limit exceeded for {url}"
            )));
        }
        Ok(())
    }
}
