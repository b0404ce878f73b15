use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, SQRT_2};
use std::fmt;
use std::str::FromStr;

use crate::error::{BucketError, ProjectionError};

/// WGS84 semi-major axis in metres. Spherical projections use it as radius.
pub const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

const MOLLWEIDE_MAX_STEPS: usize = 64;
const MOLLWEIDE_EPSILON: f64 = 1e-12;
const POLE_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

/// Forward map projections, named the way PROJ names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Projection {
    #[default]
    Mercator,
    Equirectangular,
    Miller,
    CylindricalEqualArea,
    Sinusoidal,
    Mollweide,
    LatLong,
}

impl Projection {
    pub const ALL: [Projection; 7] = [
        Projection::Mercator,
        Projection::Equirectangular,
        Projection::Miller,
        Projection::CylindricalEqualArea,
        Projection::Sinusoidal,
        Projection::Mollweide,
        Projection::LatLong,
    ];

    /// Resolve a short name such as `merc`. A `+proj=` prefix is tolerated.
    pub fn from_name(name: &str) -> Result<Self, BucketError> {
        let key = name.trim();
        let key = key.strip_prefix("+proj=").unwrap_or(key).to_ascii_lowercase();
        let proj = match key.as_str() {
            "merc" | "mercator" => Projection::Mercator,
            "eqc" | "plate_carree" => Projection::Equirectangular,
            "mill" => Projection::Miller,
            "cea" => Projection::CylindricalEqualArea,
            "sinu" => Projection::Sinusoidal,
            "moll" => Projection::Mollweide,
            "latlong" | "longlat" | "lonlat" | "latlon" => Projection::LatLong,
            _ => return Err(BucketError::UnsupportedProjection(name.to_string())),
        };
        Ok(proj)
    }

    pub fn name(self) -> &'static str {
        match self {
            Projection::Mercator => "merc",
            Projection::Equirectangular => "eqc",
            Projection::Miller => "mill",
            Projection::CylindricalEqualArea => "cea",
            Projection::Sinusoidal => "sinu",
            Projection::Mollweide => "moll",
            Projection::LatLong => "latlong",
        }
    }

    /// Project `(lon, lat)` in degrees onto the plane.
    pub fn project(self, lon: f64, lat: f64) -> Result<PlanarPoint, ProjectionError> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(ProjectionError::NonFinite);
        }
        if lon.abs() > 180.0 {
            return Err(ProjectionError::LongitudeOutOfRange(lon));
        }
        if lat.abs() > 90.0 {
            return Err(ProjectionError::LatitudeOutOfRange(lat));
        }
        let lam = lon.to_radians();
        let phi = lat.to_radians();

        let (x, y) = match self {
            Projection::Mercator => {
                if FRAC_PI_2 - phi.abs() < POLE_EPSILON {
                    return Err(ProjectionError::Singular(lat));
                }
                let e = (WGS84_F * (2.0 - WGS84_F)).sqrt();
                let es = e * phi.sin();
                let t = (FRAC_PI_4 + 0.5 * phi).tan() * ((1.0 - es) / (1.0 + es)).powf(0.5 * e);
                (WGS84_A * lam, WGS84_A * t.ln())
            }
            Projection::Equirectangular => (WGS84_A * lam, WGS84_A * phi),
            Projection::Miller => (
                WGS84_A * lam,
                WGS84_A * 1.25 * (FRAC_PI_4 + 0.4 * phi).tan().ln(),
            ),
            Projection::CylindricalEqualArea => (WGS84_A * lam, WGS84_A * phi.sin()),
            Projection::Sinusoidal => (WGS84_A * lam * phi.cos(), WGS84_A * phi),
            Projection::Mollweide => {
                let theta = mollweide_theta(phi);
                (
                    WGS84_A * 2.0 * SQRT_2 / PI * lam * theta.cos(),
                    WGS84_A * SQRT_2 * theta.sin(),
                )
            }
            Projection::LatLong => (lon, lat),
        };

        if x.is_finite() && y.is_finite() {
            Ok(PlanarPoint { x, y })
        } else {
            Err(ProjectionError::Singular(lat))
        }
    }
}

// Newton iteration on 2θ + sin 2θ = π sin φ, falling back to bisection
// whenever a step leaves the bracket. The root lies between 0 and φ.
fn mollweide_theta(phi: f64) -> f64 {
    if FRAC_PI_2 - phi.abs() < POLE_EPSILON {
        return phi;
    }
    let k = PI * phi.sin();
    let (mut lo, mut hi) = if phi >= 0.0 { (0.0, phi) } else { (phi, 0.0) };
    let mut t = phi;
    for _ in 0..MOLLWEIDE_MAX_STEPS {
        let f = 2.0 * t + (2.0 * t).sin() - k;
        if f.abs() < MOLLWEIDE_EPSILON {
            break;
        }
        if f > 0.0 {
            hi = t;
        } else {
            lo = t;
        }
        let next = t - f / (2.0 + 2.0 * (2.0 * t).cos());
        t = if next > lo && next < hi {
            next
        } else {
            0.5 * (lo + hi)
        };
    }
    t
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Projection {
    type Err = BucketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Projection::from_name(s)
    }
}
