use std::sync::Arc;

use anyhow::Context;

use pix_watch::config::{PixConfig, SourceKind};
use pix_watch::error::ConfigError;
use pix_watch::ledger::{Ledger, LibSqlLedger, MemoryLedger};
use pix_watch::mailbox::{FixtureMailbox, GmailClient, LiveMailbox, MailboxSource};
use pix_watch::pipeline::{JsonlSink, PixPipeline};
use pix_watch::poller::spawn_pix_poller;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let watch = std::env::args().skip(1).any(|a| a == "--watch");
    let config = PixConfig::from_env().context("invalid configuration")?;

    eprintln!("💸 pix-watch v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Source: {}",
        match config.source {
            SourceKind::Fixture => "fixture (sample notification)".to_string(),
            SourceKind::Gmail => format!("gmail ({})", config.filter().to_query()),
        }
    );
    eprintln!("   Batch size: {}", config.batch_size);

    let pipeline = Arc::new(
        build_pipeline(&config)
            .await
            .context("failed to set up pipeline")?,
    );

    if watch {
        eprintln!("   Mode: watch (every {}s)\n", config.poll_interval.as_secs());
        let (handle, shutdown) = spawn_pix_poller(Arc::clone(&pipeline), config.poll_interval);
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
        tracing::info!("Ctrl-C received, finishing current check");
        let _ = shutdown.send(true);
        handle.await.context("Pix poller task panicked")?;
        tracing::info!("Stopped");
        return Ok(());
    }

    eprintln!("   Mode: single run\n");
    let summary = pipeline.run().await.context("Pix check failed")?;
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

async fn build_pipeline(config: &PixConfig) -> pix_watch::error::Result<PixPipeline> {
    let ledger: Arc<dyn Ledger> = match &config.ledger_path {
        Some(path) => {
            let ledger = LibSqlLedger::new_local(path).await?;
            let known = ledger.count().await?;
            eprintln!("   Ledger: {} ({known} processed)", path.display());
            Arc::new(ledger)
        }
        None => {
            eprintln!("   Ledger: in-memory");
            Arc::new(MemoryLedger::new())
        }
    };

    let source: Arc<dyn MailboxSource> = match (config.source, &config.gmail) {
        (SourceKind::Fixture, _) => Arc::new(FixtureMailbox::sample()),
        (SourceKind::Gmail, Some(gmail)) => {
            Arc::new(LiveMailbox::new(Arc::new(GmailClient::new(gmail)?)))
        }
        (SourceKind::Gmail, None) => {
            return Err(ConfigError::MissingEnvVar("GMAIL_ACCESS_TOKEN".into()).into());
        }
    };

    let mut pipeline = PixPipeline::new(source, ledger, config.filter());
    if let Some(path) = &config.output_path {
        eprintln!("   Output: {}", path.display());
        pipeline = pipeline.with_sink(Arc::new(JsonlSink::new(path.clone())));
    }
    Ok(pipeline)
}
