mod cli;
mod error;
mod output;
mod utils;

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use reelgrab_engine::{
    AssemblyError, CancellationToken, ChatFetcher, ChatFormat, PageResolver, StreamType,
    VideoDownloader, VideoLocator, WatchPage, create_client, save_transcript,
};
use tracing::{Level, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::Args,
    error::{AppError, Result},
    output::{Reporter, VIDEO_STAGES},
    utils::{chat_transcript_path, explicit_output_path, generate_output_path},
};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = init_logging(args.verbose, args.quiet) {
        eprintln!("✗ {e}");
        process::exit(1);
    }

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling download");
            ctrl_c_token.cancel();
        }
    });

    let quiet = args.quiet;
    match run(args, token).await {
        Ok(Some(path)) => {
            if !quiet {
                println!("\n✓ Download complete: {}", path.display());
            }
        }
        Ok(None) => {
            if !quiet {
                println!("\n✓ Chat-only run complete");
            }
        }
        Err(e) => {
            eprintln!("\n✗ {e}");
            process::exit(1);
        }
    }
}

/// Returns the saved video, or `None` for a chat-only run.
async fn run(args: Args, token: CancellationToken) -> Result<Option<PathBuf>> {
    let config = args.downloader_config();
    let client = create_client(&config)?;
    let stages = if args.wants_chat() {
        VIDEO_STAGES + 1
    } else {
        VIDEO_STAGES
    };
    let reporter = Reporter::new(args.quiet, stages);

    reporter.stage(1, "Parsing URL");
    let locator = VideoLocator::parse(&args.url)?;
    reporter.detail(format!("✓ Video ID: {}", locator.video_id));
    if let Some(code) = &locator.code {
        reporter.detail(format!("✓ Access code: {code}"));
    }

    reporter.stage(
        2,
        if args.chat_only {
            "Looking up event (chat only)"
        } else {
            "Resolving video metadata"
        },
    );
    let resolver = PageResolver::new(client.clone(), &config);
    let inspected = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(AssemblyError::Cancelled.into()),
        page = resolver.inspect(&locator.video_id) => page,
    };
    let page = match inspected {
        Ok(page) => page,
        // The chat endpoints also accept the video id.
        Err(e) if args.chat_only => {
            warn!(error = %e, "Watch page unavailable");
            WatchPage::default()
        }
        Err(e) => return Err(e.into()),
    };
    let event_id = page
        .event_id
        .clone()
        .unwrap_or_else(|| locator.video_id.clone());
    let chat = ChatFetcher::new(client.clone(), &config);

    if args.chat_only {
        match &page.event_id {
            Some(id) => reporter.detail(format!("✓ Event ID: {id}")),
            None => reporter.detail(format!(
                "⚠ Event ID not found, using video ID {}",
                locator.video_id
            )),
        }

        reporter.stage(3, "Preparing chat output");
        let planned = match &args.filename {
            Some(filename) => explicit_output_path(&args.output_dir, filename)?,
            None => explicit_output_path(&args.output_dir, &format!("{}.mp4", locator.video_id))?,
        };
        reporter.stage(4, "Skipped (chat only)");
        reporter.stage(5, "Skipped (chat only)");

        save_chat(
            &chat,
            &reporter,
            &event_id,
            locator.code.as_deref(),
            &args.chat_format.formats(),
            &planned,
            &token,
        )
        .await?;
        return Ok(None);
    }

    let source = page.stream_source()?;
    reporter.detail(format!("✓ Stream found: {}", source.stream_type));
    reporter.detail(format!("  URL: {}", source.stream_url));

    reporter.stage(3, "Preparing output file");
    let output_path = match &args.filename {
        Some(filename) => explicit_output_path(&args.output_dir, filename)?,
        None => generate_output_path(&args.output_dir, &locator.video_id, "mp4")?,
    };
    reporter.detail(format!("✓ Saving to: {}", output_path.display()));

    let downloader =
        VideoDownloader::with_client(client, config).with_progress(reporter.callback());

    let result = match source.stream_type {
        StreamType::Segmented => {
            reporter.stage(4, "Parsing playlist");
            let segments = downloader
                .load_segments(&source.stream_url, &token)
                .await?;
            reporter.detail(format!("✓ Segments found: {}", segments.len()));

            reporter.stage(5, "Downloading video");
            downloader
                .download_segments(&segments, &output_path, &token)
                .await
        }
        StreamType::Direct => {
            reporter.stage(4, "Skipped (direct link)");
            reporter.stage(5, "Downloading video");
            downloader
                .download_direct(&source.stream_url, &output_path, &token)
                .await
        }
    };
    reporter.finish();

    let path = result?;
    info!(path = %path.display(), "Saved video");

    if args.save_chat {
        save_chat(
            &chat,
            &reporter,
            &event_id,
            locator.code.as_deref(),
            &args.chat_format.formats(),
            &path,
            &token,
        )
        .await?;
    }
    Ok(Some(path))
}

/// Fetch the chat and write one transcript per format next to `video_path`.
/// An empty chat or a failed write is reported but does not fail the run.
async fn save_chat(
    chat: &ChatFetcher,
    reporter: &Reporter,
    event_id: &str,
    code: Option<&str>,
    formats: &[ChatFormat],
    video_path: &Path,
    token: &CancellationToken,
) -> Result<()> {
    reporter.stage(VIDEO_STAGES + 1, "Saving chat");
    reporter.detail(format!("  Event ID: {event_id}"));

    let messages = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(AssemblyError::Cancelled.into()),
        messages = chat.fetch(event_id, code) => messages,
    };
    if messages.is_empty() {
        reporter.detail("⚠ Chat is unavailable or empty");
        return Ok(());
    }

    for &format in formats {
        let path = chat_transcript_path(video_path, format.extension());
        match save_transcript(&messages, format, &path).await {
            Ok(()) => reporter.detail(format!(
                "✓ Chat saved: {} ({} messages)",
                path.display(),
                messages.len()
            )),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to save chat transcript");
                reporter.detail(format!("⚠ Failed to save chat: {e}"));
            }
        }
    }
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}
