use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use speak_csrf_rules::load_rules;

use crate::config::GatewayConfig;

#[derive(Args, Clone)]
pub struct CheckUrlArgs {
    /// Raw URL (path and query) as the gateway would receive it
    pub url: String,
}

pub fn cmd_check_url(args: CheckUrlArgs, config: &GatewayConfig) -> Result<()> {
    let report = check_url_report(&args.url, config);
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to render report")?
    );
    Ok(())
}

pub fn check_url_report(url: &str, config: &GatewayConfig) -> serde_json::Value {
    let rules = load_rules(config);
    let matched: Vec<&str> = rules
        .matching_rules(url)
        .map(|rule| rule.name.as_str())
        .collect();
    json!({
        "url": url,
        "exempt": !matched.is_empty(),
        "matchedRules": matched,
    })
}

pub fn cmd_rules(config: &GatewayConfig) -> Result<()> {
    let rules = load_rules(config);
    println!(
        "{}",
        serde_json::to_string_pretty(&rules.summary()).context("Failed to render rules")?
    );
    Ok(())
}
