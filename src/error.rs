use std::path::PathBuf;
use thiserror::Error;

/// Failure to load either input dataset
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse boundary GeoJSON: {0}")]
    Json(#[from] simd_json::Error),

    #[error("boundary file is not a GeoJSON FeatureCollection")]
    NotAFeatureCollection,

    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV header has no `{0}` column")]
    MissingColumn(String),

    #[error("CSV has no cause columns besides the identifying ones")]
    NoCauses,

    #[error("CSV has no rows with a numeric year")]
    NoYears,
}

pub type Result<T> = std::result::Result<T, LoadError>;
