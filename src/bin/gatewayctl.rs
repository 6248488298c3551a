use std::path::PathBuf;

use axum::body::Body;
use axum::http::{header, Method, Request};
use clap::{Parser, Subcommand};
use serde_json::json;

use authz_gateway::config::load_config;
use authz_gateway::hooks::HookPipeline;
use authz_gateway::routing::{Rule, RuleMatcher, RuleSet};
use authz_gateway::transport::PoolKind;

#[derive(Parser)]
#[command(name = "gatewayctl")]
#[command(about = "Offline tooling for authz-gateway rule sets", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Check,
    /// Resolve a request against the rule set
    Match {
        /// HTTP method
        method: String,
        /// Request path, optionally with a query
        path: String,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Check => {
            println!("{}: ok ({} rules)", cli.config.display(), config.rules.len());
        }
        Commands::Match {
            method,
            path,
            host,
            content_type,
        } => {
            // Hooks are resolved by the embedding binary; matching ignores them.
            let rules = config
                .rules
                .iter()
                .map(|rule| Rule::compile(rule, HookPipeline::default()))
                .collect::<Result<Vec<_>, _>>()?;
            let rule_set = RuleSet::from_rules(rules);

            let mut request = Request::builder()
                .method(Method::from_bytes(method.to_ascii_uppercase().as_bytes())?)
                .uri(&path);
            if let Some(host) = &host {
                request = request.header(header::HOST, host);
            }
            if let Some(content_type) = &content_type {
                request = request.header(header::CONTENT_TYPE, content_type);
            }
            let request = request.body(Body::empty())?;

            match rule_set.match_request(&request) {
                Ok(matched) => {
                    let pool = PoolKind::select(matched.rule.protocol, request.headers());
                    let out = json!({
                        "rule": matched.rule.name,
                        "params": matched.params,
                        "backend": matched.rule.backend.to_string(),
                        "protocol": matched.rule.protocol.to_string(),
                        "pool": pool.as_str(),
                        "hooks": config
                            .rules
                            .iter()
                            .find(|r| r.name == matched.rule.name)
                            .map(|r| r.hooks.clone())
                            .unwrap_or_default(),
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}
