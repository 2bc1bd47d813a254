use thiserror::Error;

/// Failure of a model-backed interpreter. Always recoverable via the rules.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("interpreter unavailable: {0}")]
    Unavailable(String),

    #[error("interpreter returned malformed output: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store is corrupt: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("session store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to render chart: {0}")]
    Render(String),

    #[error("unsupported chart format '{0}' (only svg is rendered)")]
    UnsupportedFormat(String),

    #[error("unsupported file type '{0}' (expected .csv, .tsv or .txt)")]
    UnsupportedFile(String),

    #[error("could not read spreadsheet: {0}")]
    Spreadsheet(#[from] csv::Error),

    #[error("file too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("chart '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("chart I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ChartResult<T> = std::result::Result<T, ChartError>;
