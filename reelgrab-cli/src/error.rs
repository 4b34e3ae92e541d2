use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Download(#[from] reelgrab_engine::DownloadError),

    #[error("{0}")]
    Assembly(#[from] reelgrab_engine::AssemblyError),

    #[error("failed to prepare output file: {0}")]
    Output(#[from] std::io::Error),

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
