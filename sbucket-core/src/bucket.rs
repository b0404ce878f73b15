use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::error::{BucketError, ProjectionError};
use crate::probe::{Probe, ProbeId};
use crate::projection::{PlanarPoint, Projection};

/// Accepted relative deviation between occupied cells and the target.
pub const TOLERANCE: f64 = 0.05;
pub const GROW_FACTOR: f64 = 1.5;
pub const SHRINK_FACTOR: f64 = 0.9;

/// Geographic corners whose projections span the reference frame. The
/// poles are left out so every supported projection stays finite.
pub const FRAME_MIN_LON_LAT: (f64, f64) = (-180.0, -85.0);
pub const FRAME_MAX_LON_LAT: (f64, f64) = (180.0, 85.0);

pub type CellKey = (i64, i64);

/// Grid cell -> ids of the probes projected into it.
pub type BucketMap = BTreeMap<CellKey, Vec<ProbeId>>;

/// Subdivisions across the frame. Fractional while searching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub rows: f64,
    pub cols: f64,
}

impl Resolution {
    pub const INITIAL: Resolution = Resolution {
        rows: 10.0,
        cols: 20.0,
    };

    fn scaled(self, factor: f64) -> Self {
        Resolution {
            rows: self.rows * factor,
            cols: self.cols * factor,
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::INITIAL
    }
}

/// How a cell coordinate is turned into an integer key.
///
/// `Truncate` rounds toward zero, so the cells either side of an axis are
/// merged into one double-width cell. That is the long-standing behavior and
/// the default. `Floor` gives uniform cells but moves bucket boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellRounding {
    #[default]
    Truncate,
    Floor,
}

impl CellRounding {
    fn key(self, v: f64) -> i64 {
        match self {
            CellRounding::Truncate => v.trunc() as i64,
            CellRounding::Floor => v.floor() as i64,
        }
    }
}

/// Projected extent used to size cells. Fixed per projection so bucket
/// boundaries do not depend on which probes made it through filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub min: PlanarPoint,
    pub max: PlanarPoint,
}

impl Frame {
    pub fn for_projection(projection: Projection) -> Result<Self, BucketError> {
        let corner = |(lon, lat): (f64, f64)| {
            projection
                .project(lon, lat)
                .map_err(|source| BucketError::InvalidFrame {
                    name: projection.name().to_string(),
                    source,
                })
        };
        Ok(Frame {
            min: corner(FRAME_MIN_LON_LAT)?,
            max: corner(FRAME_MAX_LON_LAT)?,
        })
    }

    /// `(width, height)` of one cell.
    pub fn cell_size(&self, resolution: Resolution) -> (f64, f64) {
        (
            (self.max.x - self.min.x) / resolution.cols,
            (self.max.y - self.min.y) / resolution.rows,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedProbe {
    pub probe: Probe,
    pub proj: PlanarPoint,
}

/// Outcome of projecting one probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Projected(ProjectedProbe),
    Skipped { id: ProbeId, reason: ProjectionError },
}

impl Placement {
    pub fn of(probe: Probe, projection: Projection) -> Self {
        match projection.project(probe.longitude, probe.latitude) {
            Ok(proj) => Placement::Projected(ProjectedProbe { probe, proj }),
            Err(reason) => Placement::Skipped {
                id: probe.id,
                reason,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedSet {
    pub projected: Vec<ProjectedProbe>,
    pub skipped: Vec<(ProbeId, ProjectionError)>,
}

/// Project every probe. Probes outside the projection's domain are kept
/// aside in `skipped` instead of failing the run.
pub fn project_probes(probes: &[Probe], projection: Projection) -> ProjectedSet {
    let placements: Vec<Placement> = probes
        .par_iter()
        .map(|probe| Placement::of(*probe, projection))
        .collect();

    let mut set = ProjectedSet {
        projected: Vec::with_capacity(placements.len()),
        skipped: Vec::new(),
    };
    for placement in placements {
        match placement {
            Placement::Projected(p) => set.projected.push(p),
            Placement::Skipped { id, reason } => {
                log::trace!("probe {id} skipped: {reason}");
                set.skipped.push((id, reason));
            }
        }
    }
    set
}

/// Group projected probes by grid cell for one resolution.
pub fn bucket_map(
    points: &[ProjectedProbe],
    frame: &Frame,
    resolution: Resolution,
    rounding: CellRounding,
) -> BucketMap {
    let (div_x, div_y) = frame.cell_size(resolution);
    let mut buckets = BucketMap::new();
    for p in points {
        let key = (
            rounding.key(p.proj.x / div_x),
            rounding.key(p.proj.y / div_y),
        );
        buckets.entry(key).or_insert_with(Vec::new).push(p.probe.id);
    }
    buckets
}

pub fn within_tolerance(occupied: usize, target: usize) -> bool {
    (occupied as f64 - target as f64).abs() <= TOLERANCE * target as f64
}

/// Validated bucketing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketParams {
    target: usize,
    projection: Projection,
    frame: Frame,
    max_iterations: usize,
    rounding: CellRounding,
}

impl BucketParams {
    /// Fails on a negative target, an unknown projection name, or a
    /// projection that cannot place the reference frame.
    pub fn new(target: i64, projection: &str, max_iterations: usize) -> Result<Self, BucketError> {
        let projection = Projection::from_name(projection)?;
        Self::with_projection(target, projection, max_iterations)
    }

    pub fn with_projection(
        target: i64,
        projection: Projection,
        max_iterations: usize,
    ) -> Result<Self, BucketError> {
        let target = usize::try_from(target).map_err(|_| BucketError::InvalidTarget(target))?;
        let frame = Frame::for_projection(projection)?;
        Ok(BucketParams {
            target,
            projection,
            frame,
            max_iterations,
            rounding: CellRounding::default(),
        })
    }

    pub fn rounding(mut self, rounding: CellRounding) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn cell_rounding(&self) -> CellRounding {
        self.rounding
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketOutcome {
    pub buckets: BucketMap,
    /// Resolution that produced `buckets`.
    pub resolution: Resolution,
    pub iterations: usize,
    pub converged: bool,
    pub projected: usize,
    pub skipped: Vec<(ProbeId, ProjectionError)>,
}

impl BucketOutcome {
    pub fn occupied(&self) -> usize {
        self.buckets.len()
    }
}

/// Result of one resolution search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub buckets: BucketMap,
    /// Resolution that produced `buckets`.
    pub resolution: Resolution,
    pub iterations: usize,
    pub converged: bool,
}

/// Tune the grid until the occupied cell count is within tolerance of the
/// target, or the iteration budget runs out.
pub fn search(points: &[ProjectedProbe], params: &BucketParams) -> SearchResult {
    let target = params.target;
    let mut result = SearchResult {
        buckets: BucketMap::new(),
        resolution: Resolution::INITIAL,
        iterations: 0,
        converged: within_tolerance(0, target),
    };
    if points.is_empty() || target == 0 || params.max_iterations == 0 {
        return result;
    }

    let mut resolution = Resolution::INITIAL;
    for iteration in 1..=params.max_iterations {
        let buckets = bucket_map(points, &params.frame, resolution, params.rounding);
        let occupied = buckets.len();
        log::debug!(
            "iteration {iteration}: rows={:.3} cols={:.3} occupied={occupied} target={target}",
            resolution.rows,
            resolution.cols
        );
        result = SearchResult {
            buckets,
            resolution,
            iterations: iteration,
            converged: within_tolerance(occupied, target),
        };
        if result.converged {
            return result;
        }
        resolution = if occupied < target {
            resolution.scaled(GROW_FACTOR)
        } else {
            resolution.scaled(SHRINK_FACTOR)
        };
    }

    log::info!(
        "no convergence after {} iterations: {} occupied cells for target {}",
        params.max_iterations,
        result.buckets.len(),
        target
    );
    result
}

/// Project probes and bucket them with already validated parameters.
pub fn bucket_with(probes: &[Probe], params: &BucketParams) -> BucketOutcome {
    let set = project_probes(probes, params.projection);
    let found = search(&set.projected, params);
    BucketOutcome {
        buckets: found.buckets,
        resolution: found.resolution,
        iterations: found.iterations,
        converged: found.converged,
        projected: set.projected.len(),
        skipped: set.skipped,
    }
}

pub fn bucket(
    probes: &[Probe],
    target: i64,
    projection: &str,
    max_iterations: usize,
) -> Result<BucketOutcome, BucketError> {
    let params = BucketParams::new(target, projection, max_iterations)?;
    Ok(bucket_with(probes, &params))
}
