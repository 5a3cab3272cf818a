//! CLI argument parsing and subcommand dispatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docqa_core::Config;
use docqa_llm::DocumentAnswerer;

/// Document question-answering server.
#[derive(Debug, Parser)]
#[command(name = "docqa-server", version, about)]
pub struct Cli {
    /// Bind address (overrides HOST).
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Bind port (overrides PORT).
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Preferred upload directory (overrides UPLOAD_DIR).
    #[arg(long, global = true)]
    pub upload_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default).
    Serve,
    /// Report whether an LLM API key is configured.
    CheckEnv,
    /// Send one fixed question to the LLM and print the result.
    Probe {
        #[arg(long, default_value = "What is the fox?")]
        question: String,
        #[arg(long, default_value = "The quick brown fox.")]
        context: String,
    },
}

impl Cli {
    /// Flags win over environment-derived config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.upload_dir {
            config.storage.upload_dir = dir.clone();
        }
    }
}

/// Lines printed by `check-env`. The key itself is never shown past its
/// first four characters; the effective config follows in redacted form.
pub fn check_env_report(config: &Config) -> Vec<String> {
    let mut lines = match config.llm.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            let mut lines = vec![
                "Key found: Yes".to_string(),
                format!("Key starts with: {}", key.chars().take(4).collect::<String>()),
            ];
            if config.llm.usable_api_key().is_none() {
                lines.push("Key looks like a placeholder; /ask will report a missing key".to_string());
            }
            lines
        }
        None => vec!["Key found: No".to_string()],
    };
    lines.push(format!("Config: {}", config.redacted_summary()));
    lines
}

pub fn check_env(config: &Config) {
    for line in check_env_report(config) {
        println!("{line}");
    }
}

/// Run one question through the configured provider.
///
/// Exits non-zero unless the provider produced an answer.
pub async fn probe(config: &Config, question: &str, context: &str) -> anyhow::Result<()> {
    let answerer = DocumentAnswerer::from_config(&config.llm, &config.limits)?;
    println!("Model: {} at {}", config.llm.model, config.llm.base_url);

    let answer = answerer.answer(question, context).await;
    if !answer.is_answer() {
        anyhow::bail!("{}", answer.message());
    }
    println!("Success!");
    println!("{}", answer.message());
    Ok(())
}
