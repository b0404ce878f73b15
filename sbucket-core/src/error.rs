use thiserror::Error;

/// Configuration failures. Raised before bucketing starts and never for a
/// single bad probe.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BucketError {
    #[error("unsupported projection: {0}")]
    UnsupportedProjection(String),

    #[error("projection {name} cannot project the reference frame: {source}")]
    InvalidFrame {
        name: String,
        #[source]
        source: ProjectionError,
    },

    #[error("target count must not be negative (got {0})")]
    InvalidTarget(i64),
}

/// Why a single coordinate pair could not be projected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ProjectionError {
    #[error("coordinate is not a finite number")]
    NonFinite,

    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("latitude {0} is singular for this projection")]
    Singular(f64),
}
