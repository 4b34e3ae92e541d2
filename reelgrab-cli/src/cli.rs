use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use reelgrab_engine::config::DEFAULT_MAX_WORKERS;
use reelgrab_engine::{ChatFormat, DownloaderConfig, RetryPolicy};

#[derive(Parser, Debug)]
#[command(author, version, about = "Download facecast.net and opendemo.ru recordings", long_about = None)]
pub struct Args {
    /// Video page URL: https://facecast.net/w/<id> or https://opendemo.ru/live?id=<id>[&code=<code>]
    pub url: String,

    /// Directory the video is saved into
    #[arg(short = 'o', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// File name to use instead of `<video_id>.mp4`
    #[arg(short = 'f', long)]
    pub filename: Option<String>,

    /// Number of segments downloaded in parallel
    #[arg(short = 'w', long, default_value_t = DEFAULT_MAX_WORKERS, value_parser = parse_positive)]
    pub workers: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Attempts per segment before giving up
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: u32,

    /// Also save the event chat next to the video
    #[arg(long)]
    pub save_chat: bool,

    /// Chat transcript format
    #[arg(long, value_enum, default_value_t = ChatFormatArg::Txt)]
    pub chat_format: ChatFormatArg,

    /// Save only the chat and skip the video
    #[arg(long)]
    pub chat_only: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors and hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatFormatArg {
    Txt,
    Json,
    Html,
    /// Every format
    All,
}

impl ChatFormatArg {
    pub fn formats(self) -> Vec<ChatFormat> {
        match self {
            Self::Txt => vec![ChatFormat::Txt],
            Self::Json => vec![ChatFormat::Json],
            Self::Html => vec![ChatFormat::Html],
            Self::All => ChatFormat::ALL.to_vec(),
        }
    }
}

impl Args {
    pub fn wants_chat(&self) -> bool {
        self.save_chat || self.chat_only
    }

    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig::default()
            .with_max_workers(self.workers)
            .with_request_timeout(Duration::from_secs(self.timeout))
            .with_retry(RetryPolicy {
                max_attempts: self.retries,
                ..RetryPolicy::default()
            })
    }
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
