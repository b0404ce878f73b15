//! Spatially even selection of geolocated probes.
//!
//! Probes are projected onto a map plane, bucketed on a grid whose
//! resolution is tuned until the number of occupied cells is close to the
//! requested count, and one probe is drawn per cell.

pub mod bucket;
pub mod error;
pub mod probe;
pub mod projection;
pub mod sample;

use rand::Rng;

pub use bucket::{
    bucket, bucket_map, bucket_with, project_probes, search, BucketMap, BucketOutcome,
    BucketParams, CellKey, CellRounding, Frame, Placement, ProjectedProbe, ProjectedSet,
    Resolution, SearchResult,
};
pub use error::{BucketError, ProjectionError};
pub use probe::{filter_probes, FilterOptions, Probe, ProbeId, ProbeRecord};
pub use projection::{PlanarPoint, Projection};
pub use sample::sample;

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub ids: Vec<ProbeId>,
    /// Probes left after filtering, before projection.
    pub filtered: usize,
    pub outcome: BucketOutcome,
}

impl Selection {
    pub fn occupied(&self) -> usize {
        self.outcome.occupied()
    }
}

/// Filter, bucket and sample in one go.
pub fn select<R: Rng + ?Sized>(
    records: &[ProbeRecord],
    filter: &FilterOptions,
    params: &BucketParams,
    rng: &mut R,
) -> Selection {
    let probes = filter_probes(records, filter);
    let outcome = bucket_with(&probes, params);
    let ids = sample(&outcome.buckets, rng);
    Selection {
        ids,
        filtered: probes.len(),
        outcome,
    }
}
