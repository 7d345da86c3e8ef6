//! Command-line interface for the relay.
//!
//! `serve` runs the HTTP server; `summarize` and `send` are one-shot
//! commands for checking the AI and Jandi integrations from a shell.

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::jandi::OutboundMessage;
use crate::adapters::{AiSummarizer, JandiClient, NotionSink, Summarizer};
use crate::config::Config;
use crate::core::{
    EventLog, MemoryEventLog, RetryController, RunTracker, SqliteEventLog, StatusProjector,
    WebhookPipeline,
};
use crate::server::{self, AppState};

/// jandi-relay - Jandi webhook relay with AI summaries and a status dashboard
#[derive(Parser, Debug)]
#[command(name = "jandi-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the relay HTTP server
    Serve {
        /// Listen port (overrides $PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Summarize text from stdin using the configured AI credentials
    Summarize,

    /// Send a one-off message to the configured Jandi webhook
    Send {
        /// Message body
        #[arg(short, long)]
        body: String,

        /// Accent color (hex)
        #[arg(long)]
        color: Option<String>,

        /// Extra info line
        #[arg(long)]
        info: Option<String>,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = Config::from_env();

        match self.command {
            Commands::Serve { port } => {
                let port = port.unwrap_or(config.port);
                let state = build_state(&config)?;
                server::run(Arc::new(state), port).await
            }

            Commands::Summarize => {
                let mut text = String::new();
                io::stdin()
                    .read_to_string(&mut text)
                    .context("failed to read text from stdin")?;

                let summarizer = AiSummarizer::new(config.openai_api_key, config.ai);
                match summarizer.summarize(text.trim()).await {
                    Some(summary) => {
                        println!("{summary}");
                        Ok(())
                    }
                    None => anyhow::bail!("OPENAI_API_KEY is not configured"),
                }
            }

            Commands::Send { body, color, info } => {
                let url = config
                    .jandi_outgoing_webhook_url
                    .context("JANDI_OUTGOING_WEBHOOK_URL is not configured")?;

                let report = JandiClient::new(url)
                    .send(OutboundMessage {
                        body: Some(body),
                        connect_color: color,
                        connect_info: info,
                    })
                    .await?;
                println!("sent (status {})", report.status);
                Ok(())
            }
        }
    }
}

/// Wire up the processing core and adapters from configuration.
pub fn build_state(config: &Config) -> Result<AppState> {
    let tracker = Arc::new(RunTracker::new(chrono::Duration::seconds(
        config.retention_secs,
    )));

    let log: Arc<dyn EventLog> = match &config.event_log_path {
        Some(path) => Arc::new(SqliteEventLog::open(path, config.log_capacity)?),
        None => Arc::new(MemoryEventLog::new(config.log_capacity)),
    };

    let summarizer: Arc<dyn Summarizer> = Arc::new(AiSummarizer::new(
        config.openai_api_key.clone(),
        config.ai.clone(),
    ));

    let mut pipeline =
        WebhookPipeline::new(Arc::clone(&tracker), Arc::clone(&log), Arc::clone(&summarizer))
            .with_policy(config.summary_failure_policy);
    if let (Some(api_key), Some(database_id)) =
        (&config.notion_api_key, &config.notion_database_id)
    {
        pipeline = pipeline.with_sink(Arc::new(NotionSink::new(
            api_key.clone(),
            database_id.clone(),
        )));
    }

    let retry = RetryController::new(Arc::clone(&tracker), Arc::clone(&log), summarizer);
    let projector = StatusProjector::new(Arc::clone(&tracker), Arc::clone(&log));
    let jandi = config.jandi_outgoing_webhook_url.clone().map(JandiClient::new);

    Ok(AppState {
        pipeline,
        retry,
        projector,
        log,
        tracker,
        jandi,
        webhook_token: config.jandi_webhook_token.clone(),
    })
}
