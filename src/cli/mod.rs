//! CLI commands for ragbus using clap.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::config::{get_settings_path, load_settings_or_default, Settings};
use crate::core::{build_orchestrator, RunOutcome, Session};
use crate::generation::ProviderGenerator;
use crate::protocol::Payload;
use crate::providers::{get_current_provider, ExecutionContract};

/// ragbus - ask questions about your documents through a pipeline of agents.
#[derive(Parser)]
#[command(name = "ragbus")]
#[command(version = "0.1.0")]
#[command(about = "ragbus - agentic document QA over a message bus", long_about = None)]
pub struct Commands {
    /// Verbose logging on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ask one question about a set of files
    Ask {
        /// The question
        question: String,

        #[command(flatten)]
        input: InputArgs,

        /// Print the source snippets the answer was based on
        #[arg(long)]
        sources: bool,

        /// Print the envelopes of this run as JSON
        #[arg(long)]
        trace: bool,
    },

    /// Interactive conversation over a set of files
    Chat {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Args)]
pub struct InputArgs {
    /// Files or glob patterns to ingest (txt, md, csv)
    #[arg(short, long = "file", required = true, num_args = 1..)]
    pub files: Vec<String>,

    /// Override the configured provider: ollama, openai
    #[arg(long)]
    pub provider: Option<String>,
}

impl Commands {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Command::Ask {
                question,
                input,
                sources,
                trace,
            } => cmd_ask(question, input, *sources, *trace).await,
            Command::Chat { input } => cmd_chat(input).await,
            Command::Config => cmd_config(),
        }
    }
}

// Command implementations

async fn cmd_ask(question: &str, input: &InputArgs, sources: bool, trace: bool) -> Result<()> {
    let files = expand_inputs(&input.files)?;
    let mut session = open_session(input);

    let outcome = session.ask(question, &files).await?;
    println!("{}", render_outcome(&outcome, sources));

    if trace {
        println!("{}", session.bus().export_log(Some(&outcome.trace_id))?);
    }

    if matches!(outcome.terminal.payload(), Payload::FinalResponse(_)) {
        Ok(())
    } else {
        anyhow::bail!("no answer for trace {}", outcome.trace_id)
    }
}

async fn cmd_chat(input: &InputArgs) -> Result<()> {
    let files = expand_inputs(&input.files)?;
    let mut session = open_session(input);

    println!("Chatting over {} file(s). Commands: /reset, /history, /quit", files.len());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                println!("Started a new conversation ({})", session.trace_id());
            }
            "/history" => {
                if session.transcript().is_empty() {
                    println!("(no turns yet)");
                }
                for (i, turn) in session.transcript().iter().enumerate() {
                    println!("{}. Q: {}\n   A: {}", i + 1, turn.query, turn.answer);
                }
            }
            question => match session.ask(question, &files).await {
                Ok(outcome) => println!("{}", render_outcome(&outcome, false)),
                Err(e) => {
                    tracing::error!("Run failed: {}", e);
                    println!("Error: {}", e);
                }
            },
        }
    }

    Ok(())
}

fn cmd_config() -> Result<()> {
    let settings = load_settings_or_default();
    println!("# {}", get_settings_path()?.display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn open_session(input: &InputArgs) -> Session {
    let mut settings = load_settings_or_default();
    if let Some(provider) = &input.provider {
        settings.models.provider = provider.clone();
    }
    Session::new(build_pipeline(&settings))
}

fn build_pipeline(settings: &Settings) -> crate::core::Orchestrator {
    let provider = get_current_provider(settings);
    tracing::info!("Using provider {} ({})", provider.name(), provider.default_model());

    let generator = ProviderGenerator::new(provider)
        .with_contract(ExecutionContract::from_settings(&settings.generation));
    build_orchestrator(settings, Arc::new(generator))
}

/// Expand glob patterns; plain paths pass through so missing files are
/// reported by ingestion.
fn expand_inputs(patterns: &[String]) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            files.push(pattern.clone());
            continue;
        }

        let before = files.len();
        for entry in glob::glob(pattern)? {
            match entry {
                Ok(path) if path.is_file() => files.push(path.display().to_string()),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable path: {}", e),
            }
        }
        if files.len() == before {
            tracing::warn!("Pattern '{}' matched no files", pattern);
        }
    }
    Ok(files)
}

fn render_outcome(outcome: &RunOutcome, sources: bool) -> String {
    match outcome.terminal.payload() {
        Payload::FinalResponse(p) => {
            let mut out = p.response.clone();
            if sources {
                out.push_str(&format!("\n\nSources ({} used):", p.context_used));
                for (i, chunk) in p.source_chunks.iter().enumerate() {
                    let source = chunk
                        .metadata
                        .get("source")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown");
                    out.push_str(&format!("\n[{}] {}\n    {}", i + 1, source, chunk.text));
                }
            }
            out
        }
        Payload::ResponseError(p) => format!("Error generating answer: {}", p.error),
        Payload::PipelineError(p) => format!("Pipeline stopped at {}: {}", p.stage, p.reason),
        other => format!("Run ended on unexpected {} message", other.msg_type()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{RESPONSE_AGENT, USER};
    use crate::protocol::{Envelope, FinalResponse, Metadata, PipelineError, RetrievedDoc};

    fn outcome(envelope: Envelope) -> RunOutcome {
        RunOutcome {
            trace_id: envelope.trace_id().to_string(),
            terminal: Arc::new(envelope),
            steps: 3,
        }
    }

    #[test]
    fn test_expand_inputs_globs_and_passthrough() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(temp_dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(temp_dir.path().join("c.csv"), "x\n1").unwrap();

        let pattern = temp_dir.path().join("*.txt").display().to_string();
        let files = expand_inputs(&[pattern, "missing.md".to_string()]).unwrap();

        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("a.txt"));
        assert!(files[1].ends_with("b.txt"));
        assert_eq!(files[2], "missing.md");
    }

    #[test]
    fn test_render_final_response_with_sources() {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), "notes.md".into());
        let envelope = Envelope::new(
            RESPONSE_AGENT,
            USER,
            FinalResponse {
                response: "X is a letter.".to_string(),
                query: "What is X?".to_string(),
                context_used: 1,
                source_chunks: vec![RetrievedDoc {
                    text: "X is the 24th letter".to_string(),
                    metadata,
                }],
            },
            None,
        );

        let rendered = render_outcome(&outcome(envelope), true);
        assert!(rendered.starts_with("X is a letter."));
        assert!(rendered.contains("[1] notes.md"));
        assert!(rendered.contains("X is the 24th letter"));
    }

    #[test]
    fn test_render_pipeline_error() {
        let envelope = Envelope::new(
            "IngestionAgent",
            USER,
            PipelineError {
                stage: "IngestionAgent".to_string(),
                reason: "No documents loaded.".to_string(),
                query: "q".to_string(),
            },
            None,
        );

        assert_eq!(
            render_outcome(&outcome(envelope), false),
            "Pipeline stopped at IngestionAgent: No documents loaded."
        );
    }
}
