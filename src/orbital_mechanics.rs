// Orbital Mechanics - Keplerian element propagation
// Kepler solver, element -> Cartesian conversion, orbit paths, deflection perturbations

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Gravitational constant (m³/(kg·s²))
pub const G: f64 = 6.67430e-11;

/// Astronomical Unit in kilometers
pub const AU_KM: f64 = 149_597_870.7;

/// Earth's mean orbital radius (AU)
pub const EARTH_ORBIT_AU: f64 = 1.0;

/// Newton-Raphson convergence tolerance on the eccentric anomaly (radians)
pub const KEPLER_TOLERANCE: f64 = 1e-6;

/// Iteration cap for the Kepler solver
pub const KEPLER_MAX_ITERATIONS: u32 = 100;

/// Newton starts from E = π at or above this eccentricity
const HIGH_ECCENTRICITY: f64 = 0.8;

const BISECTION_MAX_ITERATIONS: u32 = 64;
const BISECTION_TOLERANCE: f64 = 1e-12;

/// Eccentricity ceiling applied by `apply_delta_v`
pub const MAX_PERTURBED_ECCENTRICITY: f64 = 0.99;

// =============================================================================
// 3D VECTOR
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn sub(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn distance_to(&self, other: &Vector3) -> f64 {
        self.sub(other).magnitude()
    }
}

// =============================================================================
// ORBIT DATA
// =============================================================================

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum OrbitError {
    #[error("invalid orbital elements: {0}")]
    InvalidElements(String),

    #[error("Kepler solver did not converge (M={mean_anomaly} rad, e={eccentricity}) after {iterations} iterations")]
    NonConvergent {
        mean_anomaly: f64,
        eccentricity: f64,
        iterations: u32,
    },
}

/// Osculating orbit at one epoch. Distances in AU, angles in degrees.
///
/// Value object: every operation returns a new instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OrbitData {
    /// Semi-major axis (AU)
    pub a: f64,
    /// Eccentricity, [0, 1)
    pub e: f64,
    /// Inclination (degrees)
    pub i: f64,
    /// Argument of periapsis (degrees)
    pub omega: f64,
    /// Longitude of ascending node (degrees)
    #[serde(rename = "Omega")]
    pub omega_node: f64,
    /// Mean anomaly (degrees)
    #[serde(rename = "M")]
    pub mean_anomaly: f64,
}

impl OrbitData {
    pub fn new(a: f64, e: f64, i: f64, omega: f64, omega_node: f64, mean_anomaly: f64) -> Self {
        Self {
            a,
            e,
            i,
            omega,
            omega_node,
            mean_anomaly,
        }
    }

    /// Same orbit, different point in time.
    pub fn with_mean_anomaly(&self, mean_anomaly: f64) -> Self {
        Self {
            mean_anomaly,
            ..*self
        }
    }

    pub fn validate(&self) -> Result<(), OrbitError> {
        if !(self.a.is_finite() && self.a > 0.0) {
            return Err(OrbitError::InvalidElements(format!(
                "semi-major axis must be positive (got {})",
                self.a
            )));
        }
        if !(0.0..1.0).contains(&self.e) {
            return Err(OrbitError::InvalidElements(format!(
                "eccentricity must lie in [0, 1) (got {})",
                self.e
            )));
        }
        let angles = [self.i, self.omega, self.omega_node, self.mean_anomaly];
        if angles.iter().any(|a| !a.is_finite()) {
            return Err(OrbitError::InvalidElements(
                "angles must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Closest distance to the Sun (AU)
    pub fn perihelion(&self) -> f64 {
        self.a * (1.0 - self.e)
    }

    /// Farthest distance from the Sun (AU)
    pub fn aphelion(&self) -> f64 {
        self.a * (1.0 + self.e)
    }
}

// =============================================================================
// KEPLER EQUATION
// =============================================================================

/// Solve Kepler's equation M = E - e*sin(E) using Newton-Raphson.
///
/// M is wrapped into [0, 2π). Newton starts from E = M, or from π when e >= 0.8.
/// If it has not settled within the iteration cap, bisection on [0, 2π] finishes
/// the job; f(E) is strictly increasing there for any e < 1. Only e outside
/// [0, 1) reports `NonConvergent`.
pub fn solve_kepler_equation(mean_anomaly: f64, eccentricity: f64) -> Result<f64, OrbitError> {
    let non_convergent = |iterations| OrbitError::NonConvergent {
        mean_anomaly,
        eccentricity,
        iterations,
    };
    if !(0.0..1.0).contains(&eccentricity) || !mean_anomaly.is_finite() {
        return Err(non_convergent(0));
    }

    let m = mean_anomaly.rem_euclid(TAU);
    let kepler = |e_anom: f64| e_anom - eccentricity * e_anom.sin() - m;

    let mut e_anom = if eccentricity >= HIGH_ECCENTRICITY {
        std::f64::consts::PI
    } else {
        m
    };

    for _ in 0..KEPLER_MAX_ITERATIONS {
        let f_prime = 1.0 - eccentricity * e_anom.cos();
        let delta = kepler(e_anom) / f_prime;

        if !delta.is_finite() {
            break;
        }
        e_anom -= delta;

        if delta.abs() <= KEPLER_TOLERANCE {
            return Ok(e_anom);
        }
    }

    tracing::debug!(
        "Kepler Newton stalled (M={:.6}, e={:.6}), bisecting",
        m,
        eccentricity
    );

    let (mut lo, mut hi) = (0.0, TAU);
    for _ in 0..BISECTION_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if kepler(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= BISECTION_TOLERANCE {
            return Ok(0.5 * (lo + hi));
        }
    }

    Err(non_convergent(KEPLER_MAX_ITERATIONS + BISECTION_MAX_ITERATIONS))
}

/// Position in the orbital (perifocal) plane, before any rotation. AU.
pub fn perifocal_position(orbit: &OrbitData) -> Result<(f64, f64), OrbitError> {
    orbit.validate()?;

    let e = orbit.e;
    let eccentric_anomaly = solve_kepler_equation(orbit.mean_anomaly.to_radians(), e)?;

    let true_anomaly = 2.0
        * ((1.0 + e).sqrt() * (eccentric_anomaly / 2.0).sin())
            .atan2((1.0 - e).sqrt() * (eccentric_anomaly / 2.0).cos());

    let r = orbit.a * (1.0 - e * eccentric_anomaly.cos());

    Ok((r * true_anomaly.cos(), r * true_anomaly.sin()))
}

/// Convert orbital elements to heliocentric ecliptic Cartesian coordinates (AU).
pub fn orbital_to_cartesian(orbit: &OrbitData) -> Result<Vector3, OrbitError> {
    let (x_orb, y_orb) = perifocal_position(orbit)?;

    let cos_omega = orbit.omega_node.to_radians().cos();
    let sin_omega = orbit.omega_node.to_radians().sin();
    let cos_w = orbit.omega.to_radians().cos();
    let sin_w = orbit.omega.to_radians().sin();
    let cos_i = orbit.i.to_radians().cos();
    let sin_i = orbit.i.to_radians().sin();

    // Perifocal -> inertial rotation (Ω, i, ω)
    let r11 = cos_omega * cos_w - sin_omega * sin_w * cos_i;
    let r12 = -cos_omega * sin_w - sin_omega * cos_w * cos_i;
    let r21 = sin_omega * cos_w + cos_omega * sin_w * cos_i;
    let r22 = -sin_omega * sin_w + cos_omega * cos_w * cos_i;
    let r31 = sin_w * sin_i;
    let r32 = cos_w * sin_i;

    Ok(Vector3::new(
        r11 * x_orb + r12 * y_orb,
        r21 * x_orb + r22 * y_orb,
        r31 * x_orb + r32 * y_orb,
    ))
}

/// Sweep mean anomaly linearly over 0..=360° and return `num_points + 1` positions.
///
/// The last point closes the loop on the first.
pub fn generate_orbit_path(orbit: &OrbitData, num_points: usize) -> Result<Vec<Vector3>, OrbitError> {
    if num_points == 0 {
        return Err(OrbitError::InvalidElements(
            "orbit path needs at least one segment".to_string(),
        ));
    }

    (0..=num_points)
        .map(|i| {
            let mean_anomaly = 360.0 * i as f64 / num_points as f64;
            orbital_to_cartesian(&orbit.with_mean_anomaly(mean_anomaly))
        })
        .collect()
}

// =============================================================================
// DEFLECTION
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeltaVDirection {
    Prograde,
    Retrograde,
}

/// Kinetic-impactor momentum transfer: Δv = β·m_impactor·v_impactor / m_asteroid
///
/// Units follow the inputs (kg, m/s in -> m/s out). `beta` >= 1 accounts for ejecta.
pub fn calculate_deflection_delta_v(
    asteroid_mass: f64,
    impactor_mass: f64,
    impactor_velocity: f64,
    beta: f64,
) -> f64 {
    if asteroid_mass <= 0.0 {
        return 0.0;
    }
    beta * impactor_mass * impactor_velocity / asteroid_mass
}

/// Approximate post-deflection orbit.
///
/// Not a propagator: `a` shifts by `a·(|Δv|/1000)·0.001` (negative for retrograde)
/// and `e` grows by `|Δv|·1e-4`, capped at 0.99. Direction carries the sign,
/// so a negative `delta_v` is treated as its magnitude.
pub fn apply_delta_v(orbit: &OrbitData, delta_v: f64, direction: DeltaVDirection) -> OrbitData {
    let delta_v = delta_v.abs();
    let factor = match direction {
        DeltaVDirection::Prograde => 1.0,
        DeltaVDirection::Retrograde => -1.0,
    };
    let delta_a = orbit.a * (delta_v / 1000.0) * factor * 0.001;

    OrbitData {
        a: orbit.a + delta_a,
        e: (orbit.e + delta_v * 0.0001).min(MAX_PERTURBED_ECCENTRICITY),
        ..*orbit
    }
}

/// True iff Earth's orbit (1 AU) lies within [perihelion, aphelion].
pub fn check_earth_intersection(orbit: &OrbitData) -> bool {
    orbit.perihelion() <= EARTH_ORBIT_AU && orbit.aphelion() >= EARTH_ORBIT_AU
}

/// Orbital period in days from Kepler's third law (a in AU -> years).
///
/// Used as a coarse time-until-encounter estimate.
pub fn orbital_period_days(orbit: &OrbitData) -> f64 {
    orbit.a.max(0.0).powi(3).sqrt() * 365.25
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_orbit() -> OrbitData {
        OrbitData::new(1.458, 0.2227, 10.83, 178.9, 304.3, 0.0)
    }

    #[test]
    fn test_kepler_equation_circular() {
        // For circular orbit e=0, E = M
        let e = solve_kepler_equation(1.0, 0.0).unwrap();
        assert!((e - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_kepler_equation_eccentric() {
        let e = solve_kepler_equation(0.5, 0.5).unwrap();
        let check = e - 0.5 * e.sin();
        assert!((check - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_kepler_equation_high_eccentricity() {
        let e = solve_kepler_equation(0.01, 0.98).unwrap();
        let check = e - 0.98 * e.sin();
        assert!((check - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_kepler_equation_near_parabolic_sweep() {
        for e in [0.98, 0.99, 0.999] {
            for step in 0..3600 {
                let m = (step as f64 * 0.1).to_radians();
                let ecc = solve_kepler_equation(m, e).unwrap();
                assert!((ecc - e * ecc.sin() - m).abs() < 1e-6, "e={e} M={m}");
            }
        }
        // first stall for plain Newton from E = M
        let m = 7.11f64.to_radians();
        let ecc = solve_kepler_equation(m, 0.98).unwrap();
        assert_abs_diff_eq!(ecc - 0.98 * ecc.sin(), m, epsilon = 1e-6);
    }

    #[test]
    fn test_kepler_equation_parabolic_is_non_convergent() {
        let result = solve_kepler_equation(0.0, 1.0);
        assert!(matches!(result, Err(OrbitError::NonConvergent { .. })));
        assert!(solve_kepler_equation(1.0, 1.5).is_err());
        assert!(solve_kepler_equation(f64::NAN, 0.5).is_err());
    }

    #[test]
    fn test_circular_orbit_radius_equals_a() {
        let orbit = OrbitData::new(2.5, 0.0, 0.0, 0.0, 0.0, 0.0);
        for m in [0.0, 45.0, 133.0, 270.0, 359.0] {
            let (x, y) = perifocal_position(&orbit.with_mean_anomaly(m)).unwrap();
            assert_abs_diff_eq!((x * x + y * y).sqrt(), 2.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_perihelion_position_along_x_for_unrotated_orbit() {
        let orbit = OrbitData::new(1.5, 0.4, 0.0, 0.0, 0.0, 0.0);
        let p = orbital_to_cartesian(&orbit).unwrap();
        assert_abs_diff_eq!(p.x, 0.9, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_preserves_radius() {
        let orbit = sample_orbit().with_mean_anomaly(77.0);
        let (x, y) = perifocal_position(&orbit).unwrap();
        let p = orbital_to_cartesian(&orbit).unwrap();
        assert_abs_diff_eq!(p.magnitude(), (x * x + y * y).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_inclined_orbit_leaves_ecliptic() {
        let orbit = OrbitData::new(1.0, 0.0, 90.0, 0.0, 0.0, 90.0);
        let p = orbital_to_cartesian(&orbit).unwrap();
        assert_abs_diff_eq!(p.z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_orbit_rejected() {
        let hyperbolic = OrbitData::new(1.0, 1.2, 0.0, 0.0, 0.0, 0.0);
        assert!(matches!(
            orbital_to_cartesian(&hyperbolic),
            Err(OrbitError::InvalidElements(_))
        ));

        let negative_a = OrbitData::new(-1.0, 0.1, 0.0, 0.0, 0.0, 0.0);
        assert!(negative_a.validate().is_err());
    }

    #[test]
    fn test_orbit_path_is_closed() {
        let path = generate_orbit_path(&sample_orbit(), 100).unwrap();
        assert_eq!(path.len(), 101);
        assert!(path[0].distance_to(&path[100]) < 1e-9);
    }

    #[test]
    fn test_orbit_path_at_capped_eccentricity() {
        let orbit = OrbitData::new(1.2, MAX_PERTURBED_ECCENTRICITY, 5.0, 30.0, 60.0, 0.0);
        let path = generate_orbit_path(&orbit, 100).unwrap();

        assert_eq!(path.len(), 101);
        for p in &path {
            let r = p.magnitude();
            assert!(r >= orbit.perihelion() - 1e-6 && r <= orbit.aphelion() + 1e-6);
        }
    }

    #[test]
    fn test_orbit_path_requires_segments() {
        assert!(generate_orbit_path(&sample_orbit(), 0).is_err());
    }

    #[test]
    fn test_deflection_delta_v() {
        // DART-like: 610 kg at 6.1 km/s into a 4.3e9 kg moonlet, beta 3.6
        let dv = calculate_deflection_delta_v(4.3e9, 610.0, 6100.0, 3.6);
        assert_abs_diff_eq!(dv, 3.6 * 610.0 * 6100.0 / 4.3e9, epsilon = 1e-12);
        assert_eq!(calculate_deflection_delta_v(0.0, 610.0, 6100.0, 1.0), 0.0);
    }

    #[test]
    fn test_apply_delta_v_direction() {
        let orbit = sample_orbit();
        let pro = apply_delta_v(&orbit, 5.0, DeltaVDirection::Prograde);
        let retro = apply_delta_v(&orbit, 5.0, DeltaVDirection::Retrograde);

        assert!(pro.a > orbit.a);
        assert!(retro.a < orbit.a);
        assert!(pro.e > orbit.e);
        assert_eq!(pro.i, orbit.i);
        // input orbit untouched
        assert_eq!(orbit, sample_orbit());
    }

    #[test]
    fn test_apply_delta_v_caps_eccentricity() {
        let orbit = OrbitData::new(1.2, 0.95, 0.0, 0.0, 0.0, 0.0);
        let perturbed = apply_delta_v(&orbit, 10_000.0, DeltaVDirection::Prograde);
        assert_eq!(perturbed.e, MAX_PERTURBED_ECCENTRICITY);
    }

    #[test]
    fn test_apply_delta_v_negative_magnitude() {
        let orbit = OrbitData::new(1.2, 0.0005, 0.0, 0.0, 0.0, 0.0);
        let negative = apply_delta_v(&orbit, -20.0, DeltaVDirection::Prograde);
        let positive = apply_delta_v(&orbit, 20.0, DeltaVDirection::Prograde);

        assert_eq!(negative, positive);
        assert!(negative.e > orbit.e);
        assert!(negative.validate().is_ok());
    }

    #[test]
    fn test_earth_intersection() {
        let crossing = OrbitData::new(1.5, 0.4, 0.0, 0.0, 0.0, 0.0);
        assert_abs_diff_eq!(crossing.perihelion(), 0.9, epsilon = 1e-12);
        assert_abs_diff_eq!(crossing.aphelion(), 2.1, epsilon = 1e-12);
        assert!(check_earth_intersection(&crossing));

        let outer = OrbitData::new(2.7, 0.1, 0.0, 0.0, 0.0, 0.0);
        assert!(!check_earth_intersection(&outer));
    }

    #[test]
    fn test_orbital_period_days() {
        let earth_like = OrbitData::new(1.0, 0.0167, 0.0, 0.0, 0.0, 0.0);
        assert_abs_diff_eq!(orbital_period_days(&earth_like), 365.25, epsilon = 1e-9);
    }

    #[test]
    fn test_orbit_data_wire_names() {
        let json = serde_json::to_value(OrbitData::new(1.0, 0.1, 2.0, 3.0, 4.0, 5.0)).unwrap();
        assert_eq!(json["Omega"], 4.0);
        assert_eq!(json["M"], 5.0);
        assert_eq!(json["omega"], 3.0);
    }
}
