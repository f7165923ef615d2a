use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use permissions_broker::load_policy_from_path;
use tokio::signal;
use tracing::{info, warn};

use crate::app_context::AppContext;
use crate::config::{AppConfig, DriverKind};

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// What the run should achieve
    #[arg(long)]
    pub goal: String,

    /// Add a host to the navigation allowlist (repeatable)
    #[arg(long = "allow-domain", value_name = "DOMAIN")]
    pub allow_domains: Vec<String>,

    /// Accept free-text steps through the loose step reader
    #[arg(long)]
    pub no_multi: bool,

    /// Launch a visible browser window
    #[arg(long)]
    pub show: bool,

    /// Run against the in-memory demo site
    #[arg(long)]
    pub stub: bool,

    /// Save a screenshot after each successful step
    #[arg(long, value_name = "DIR")]
    pub screenshots: Option<PathBuf>,

    /// Replans allowed before giving up
    #[arg(long, value_name = "N")]
    pub max_replans: Option<u32>,

    /// Permission policy file (YAML or JSON) replacing the configured flags
    #[arg(long, value_name = "FILE")]
    pub permissions: Option<PathBuf>,
}

impl RunArgs {
    pub fn apply(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(path) = &self.permissions {
            config.permissions = load_policy_from_path(path)
                .with_context(|| format!("loading permission policy {}", path.display()))?;
        }
        for domain in &self.allow_domains {
            let domain = domain.trim().to_ascii_lowercase();
            if !domain.is_empty() && !config.security.allowed_domains.contains(&domain) {
                config.security.allowed_domains.push(domain);
            }
        }
        if self.no_multi {
            config.orchestrator.loose_steps = true;
        }
        if self.show {
            config.browser.chromium.headless = false;
        }
        if self.stub {
            config.browser.driver = DriverKind::Stub;
        }
        if let Some(dir) = &self.screenshots {
            config.orchestrator.screenshots_dir = Some(dir.clone());
        }
        if let Some(max) = self.max_replans {
            config.orchestrator.max_replans = max;
        }
        Ok(())
    }
}

pub async fn cmd_run(args: RunArgs, mut config: AppConfig) -> Result<()> {
    args.apply(&mut config)?;
    if config.security.allowed_domains.is_empty() {
        warn!("allowlist is empty; every navigation will be denied");
    }

    let context = AppContext::build(config).await?;
    context.start().await?;

    let handle = context
        .runs()
        .submit(&args.goal)
        .await
        .context("creating run")?;
    info!(run = %handle.run_id(), "run started; Ctrl+C stops after the current step");

    let token = handle.cancellation_token();
    let watcher = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("stop requested");
            token.cancel();
        }
    });
    let outcome = handle.wait().await;
    watcher.abort();

    let shutdown = context.shutdown().await;
    let result = outcome.context("run did not finish")?;
    shutdown?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
