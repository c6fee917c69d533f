use clap::Parser;
use eyre::Context;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_live_chat::{
    ChatMessage, ClientConfig, DEFAULT_CHAT_PARTS, LiveChatClient, MessageKind, ReplayOrder,
};

// used when a page leaves out its poll interval, and after a failed poll
const FALLBACK_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Follow a YouTube live stream's chat from the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Channel to find the live stream of
    #[arg(short, long, required_unless_present = "video_id")]
    channel_id: Option<String>,

    /// Live video to follow directly, skipping the channel lookup
    #[arg(short, long)]
    video_id: Option<String>,

    /// API key; repeat to rotate between several keys
    #[arg(short = 'k', long = "api-key", env = "YOUTUBE_API_KEY")]
    api_keys: Vec<String>,

    /// JSON file with client settings. Keys given on the command line are added to its keys.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print each batch oldest first
    #[arg(long)]
    chronological: bool,

    /// Find the live video by reading the channel page instead of using search quota
    #[arg(long)]
    scrape: bool,

    /// `part` parameter for chat polls
    #[arg(long, default_value = DEFAULT_CHAT_PARTS)]
    parts: String,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => ClientConfig::from_json_file(path)?,
        None => ClientConfig::default(),
    };
    config.api_keys.extend(args.api_keys.iter().cloned());
    if config.api_keys.is_empty() {
        eyre::bail!("no API key given; pass --api-key or set YOUTUBE_API_KEY");
    }

    let mut yt = LiveChatClient::new(config).context("set up TLS")?;

    let video_id = match (&args.video_id, &args.channel_id) {
        (Some(video_id), _) => video_id.clone(),
        (None, Some(channel_id)) => {
            let found = if args.scrape {
                yt.scrape_live_video_id(channel_id).await
            } else {
                yt.find_live_video_id(channel_id).await
            }
            .context("look up live video")?;
            match found {
                Some(video_id) => video_id,
                None => {
                    tracing::info!(channel_id, "channel is not live");
                    return Ok(());
                }
            }
        }
        (None, None) => eyre::bail!("pass --channel-id or --video-id"),
    };

    let details = yt
        .get_live_stream_details(&video_id)
        .await
        .context("fetch live streaming details")?;
    if !details.is_live {
        tracing::info!(video_id, "video has no active live chat");
        return Ok(());
    }
    tracing::info!(
        video_id,
        viewers = details.concurrent_viewers,
        "following live chat"
    );

    let order = if args.chronological {
        ReplayOrder::Chronological
    } else {
        ReplayOrder::Received
    };
    while yt.is_still_live() {
        let wait = match yt
            .poll_chat_messages(&details.active_live_chat_id, &args.parts, order)
            .await
        {
            Ok(batch) => {
                for message in &batch.messages {
                    print_message(message);
                }
                match batch.polling_interval_millis() {
                    0 => FALLBACK_POLL_INTERVAL,
                    ms => Duration::from_millis(ms),
                }
            }
            Err(e) if e.is_quota_or_auth() => {
                return Err(e).context("poll live chat");
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat poll failed; retrying");
                FALLBACK_POLL_INTERVAL
            }
        };
        tokio::time::sleep(wait).await;
    }

    tracing::info!("live chat has ended");
    Ok(())
}

fn print_message(message: &ChatMessage) {
    let name = message.display_name.as_deref().unwrap_or("?");
    let text = message.display_message.as_deref().unwrap_or("");
    match &message.kind {
        MessageKind::SuperChat(p) | MessageKind::SuperSticker(p) => {
            let amount = p.amount_micros.map_or(0.0, |m| m as f64 / 1_000_000.0);
            let currency = p.currency.as_deref().unwrap_or("");
            println!("[{} {amount:.2} {currency}] {name}: {text}", message.kind);
        }
        MessageKind::Text | MessageKind::Unknown => {
            let badge = if message.is_chat_owner {
                "*"
            } else if message.is_chat_moderator {
                "@"
            } else {
                ""
            };
            println!("{badge}{name}: {text}");
        }
    }
}
