use anyhow::{Context, Result};
use clap::Args;
use memory_center::SelectorMemory;
use webpilot_core_types::origin_of;

use crate::config::AppConfig;

#[derive(Args, Clone, Debug)]
pub struct SelectorsArgs {
    /// Host or origin whose cached selectors to list
    #[arg(long)]
    pub origin: String,

    /// Only this action kind (click or type)
    #[arg(long)]
    pub action: Option<String>,

    /// Only this target label
    #[arg(long)]
    pub label: Option<String>,
}

pub fn cmd_selectors(args: SelectorsArgs, config: &AppConfig) -> Result<()> {
    let memory = match &config.memory.path {
        Some(path) => SelectorMemory::with_persistence(path)
            .with_context(|| format!("opening selector memory {}", path.display()))?,
        None => SelectorMemory::new(),
    };
    let origin = normalize_origin(&args.origin)?;
    let records = memory.list(Some(&origin), args.action.as_deref(), args.label.as_deref());
    let stats = memory.stats_snapshot();
    println!(
        "{} cached selectors in total, {} upserts recorded",
        stats.current_records, stats.upserts
    );
    if records.is_empty() {
        println!("No cached selectors for {origin}");
        return Ok(());
    }
    for record in records {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            record.action,
            record.label,
            record.descriptor,
            record.success_count,
            record.updated_at.to_rfc3339()
        );
    }
    Ok(())
}

/// Accepts `example.com` as well as `https://example.com/path`.
fn normalize_origin(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    origin_of(&candidate).with_context(|| format!("invalid origin {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_hosts_become_https_origins() {
        assert_eq!(normalize_origin("example.com").unwrap(), "https://example.com");
        assert_eq!(
            normalize_origin("http://app.test:8080/login").unwrap(),
            "http://app.test:8080"
        );
    }
}
