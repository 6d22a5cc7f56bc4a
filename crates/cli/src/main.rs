//! Tailstream CLI - tst command

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use tailstream::{Backpressure, DeliveryMode, TailConfig, WatchConfig};
use tokio::io::AsyncWriteExt;

/// Tailstream - follow growing files as async streams
#[derive(Parser)]
#[command(name = "tst")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail a file, printing new content as it is appended
    Tail {
        /// File to tail
        path: PathBuf,

        /// Emit raw bytes instead of decoded lines
        #[arg(long)]
        bytes: bool,

        /// Start from the beginning of the file instead of its current end
        #[arg(long)]
        from_start: bool,

        /// Explicit byte offset to start from (overrides --from-start)
        #[arg(long)]
        start_position: Option<u64>,

        /// Maximum bytes per read chunk
        #[arg(long, default_value = "8192")]
        chunk_size: usize,

        /// Poll interval in milliseconds (non-blocking mode)
        #[arg(long, default_value = "1000")]
        poll_interval_ms: u64,

        /// Block on the platform's native notification facility
        #[arg(long)]
        blocking: bool,

        /// Backpressure policy while the consumer is behind
        #[arg(long, value_enum, default_value = "buffer")]
        policy: PolicyArg,

        /// Charset label for line decoding (e.g. utf-8, windows-1252)
        #[arg(long, default_value = "utf-8")]
        encoding: String,
    },
    /// Print raw change notifications for a path
    Watch {
        /// File or directory to watch
        path: PathBuf,

        /// Poll interval in milliseconds (non-blocking mode)
        #[arg(long, default_value = "1000")]
        poll_interval_ms: u64,

        /// Block on the platform's native notification facility
        #[arg(long)]
        blocking: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Buffer,
    Drop,
    Latest,
}

impl From<PolicyArg> for Backpressure {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Buffer => Backpressure::Buffer,
            PolicyArg::Drop => Backpressure::Drop,
            PolicyArg::Latest => Backpressure::Latest,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tail {
            path,
            bytes,
            from_start,
            start_position,
            chunk_size,
            poll_interval_ms,
            blocking,
            policy,
            encoding,
        } => {
            let encoding = encoding_rs::Encoding::for_label(encoding.as_bytes())
                .ok_or_else(|| anyhow!("unknown charset label: {encoding}"))?;
            let start_position = match start_position {
                Some(pos) => pos,
                None if from_start => 0,
                // tail -f style: start at the current end of the file
                None => std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
            };
            let config = TailConfig {
                start_position,
                chunk_size,
                poll_interval: Duration::from_millis(poll_interval_ms),
                mode: delivery_mode(blocking),
                backpressure: policy.into(),
                encoding,
                ..Default::default()
            };
            tracing::debug!(path = %path.display(), start_position, "starting tail session");
            if bytes {
                tail_as_bytes(&path, config).await
            } else {
                tail_as_lines(&path, config).await
            }
        }
        Commands::Watch {
            path,
            poll_interval_ms,
            blocking,
        } => {
            let config = WatchConfig {
                poll_interval: Duration::from_millis(poll_interval_ms),
                mode: delivery_mode(blocking),
                ..Default::default()
            };
            let mut events = tailstream::watch(&path, config)
                .with_context(|| format!("cannot watch {}", path.display()))?;
            while let Some(event) = events.next().await {
                println!("{:?} {:?}", event.kind, event.paths);
            }
            Ok(())
        }
    }
}

fn delivery_mode(blocking: bool) -> DeliveryMode {
    if blocking {
        DeliveryMode::Blocking
    } else {
        DeliveryMode::NonBlocking
    }
}

async fn tail_as_lines(path: &Path, config: TailConfig) -> Result<()> {
    let mut lines = Box::pin(
        tailstream::tail_lines(path, config)
            .with_context(|| format!("cannot tail {}", path.display()))?,
    );
    while let Some(line) = lines.next().await {
        println!("{}", line?);
    }
    Ok(())
}

async fn tail_as_bytes(path: &Path, config: TailConfig) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut chunks = Box::pin(
        tailstream::tail_bytes(path, config)
            .with_context(|| format!("cannot tail {}", path.display()))?,
    );
    while let Some(chunk) = chunks.next().await {
        stdout.write_all(&chunk?).await?;
        stdout.flush().await?;
    }
    Ok(())
}
