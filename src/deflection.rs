// Deflection Planner - mitigation strategy estimates
// Kinetic impactor, gravity tractor, laser ablation

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::orbital_mechanics::{
    apply_delta_v, calculate_deflection_delta_v, DeltaVDirection, OrbitData, G,
};

const SECONDS_PER_DAY: f64 = 86_400.0;
const SPEED_OF_LIGHT: f64 = 3.0e8;

// Kinetic impactor (DART-class spacecraft)
pub const IMPACTOR_MASS_KG: f64 = 1000.0;
pub const IMPACTOR_VELOCITY_MS: f64 = 10_000.0;
pub const IMPACTOR_BETA: f64 = 2.0;

// Gravity tractor
pub const TRACTOR_MASS_KG: f64 = 20_000.0;
pub const TRACTOR_HOVER_M: f64 = 100.0;

// Laser ablation
pub const LASER_POWER_W: f64 = 100_000.0;
pub const LASER_EFFICIENCY: f64 = 0.1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DeflectionStrategy {
    KineticImpactor,
    GravityTractor,
    LaserAblation,
}

impl DeflectionStrategy {
    pub const ALL: [DeflectionStrategy; 3] = [
        DeflectionStrategy::KineticImpactor,
        DeflectionStrategy::GravityTractor,
        DeflectionStrategy::LaserAblation,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            DeflectionStrategy::KineticImpactor => "kinetic-impactor",
            DeflectionStrategy::GravityTractor => "gravity-tractor",
            DeflectionStrategy::LaserAblation => "laser-ablation",
        }
    }

    /// Mission lead time below which success odds start to drop
    pub fn min_days(&self) -> f64 {
        match self {
            DeflectionStrategy::KineticImpactor => 180.0,
            DeflectionStrategy::GravityTractor => 365.0,
            DeflectionStrategy::LaserAblation => 270.0,
        }
    }

    fn base_success(&self) -> f64 {
        match self {
            DeflectionStrategy::KineticImpactor => 0.85,
            DeflectionStrategy::GravityTractor => 0.95,
            DeflectionStrategy::LaserAblation => 0.70,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeflectionRequest {
    #[serde(rename = "type")]
    pub strategy: DeflectionStrategy,
    /// kg
    pub asteroid_mass: f64,
    /// days until impact
    pub time_available: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orbit: Option<OrbitData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeflectionResult {
    pub strategy: DeflectionStrategy,
    /// m/s
    pub delta_v: f64,
    pub success_probability: f64,
    pub required_missions: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_orbit: Option<OrbitData>,
}

impl DeflectionRequest {
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !(self.asteroid_mass.is_finite() && self.asteroid_mass > 0.0) {
            return Err(ParameterError::Mass(self.asteroid_mass));
        }
        if !(self.time_available.is_finite() && self.time_available >= 0.0) {
            return Err(ParameterError::TimeAvailable(self.time_available));
        }
        Ok(())
    }
}

/// Estimate Δv, success odds and mission count for one strategy.
pub fn plan_deflection(request: &DeflectionRequest) -> Result<DeflectionResult, ParameterError> {
    request.validate()?;

    let mass = request.asteroid_mass;
    let seconds = request.time_available * SECONDS_PER_DAY;

    let (delta_v, required_missions) = match request.strategy {
        DeflectionStrategy::KineticImpactor => {
            let dv = calculate_deflection_delta_v(mass, IMPACTOR_MASS_KG, IMPACTOR_VELOCITY_MS, IMPACTOR_BETA);
            // one spacecraft per 100 impactor masses of asteroid
            (dv, missions(mass / (IMPACTOR_MASS_KG * 100.0)))
        }
        DeflectionStrategy::GravityTractor => {
            // a = G·m_sc/d², independent of the asteroid's own mass
            let accel = G * TRACTOR_MASS_KG / (TRACTOR_HOVER_M * TRACTOR_HOVER_M);
            (accel * seconds, 1)
        }
        DeflectionStrategy::LaserAblation => {
            let thrust = LASER_POWER_W * LASER_EFFICIENCY / SPEED_OF_LIGHT;
            (thrust * seconds / mass, missions(mass / 1e9))
        }
    };

    let strategy = request.strategy;
    let success_probability = (request.time_available / strategy.min_days()).min(1.0) * strategy.base_success();

    Ok(DeflectionResult {
        strategy,
        delta_v,
        success_probability,
        required_missions,
        new_orbit: request
            .orbit
            .map(|orbit| apply_delta_v(&orbit, delta_v, DeltaVDirection::Prograde)),
    })
}

fn missions(ratio: f64) -> u64 {
    (ratio.floor() as u64).max(1)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StrategyInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub effectiveness: f64,
    pub min_time_required_days: u32,
    pub technology_readiness: &'static str,
    pub example: &'static str,
}

pub fn strategy_catalog() -> Vec<StrategyInfo> {
    vec![
        StrategyInfo {
            id: DeflectionStrategy::KineticImpactor.id(),
            name: "Kinetic Impactor",
            description: "Ram the asteroid with a spacecraft to change its velocity vector",
            effectiveness: 0.8,
            min_time_required_days: 180,
            technology_readiness: "proven",
            example: "NASA DART mission (2022)",
        },
        StrategyInfo {
            id: DeflectionStrategy::GravityTractor.id(),
            name: "Gravity Tractor",
            description: "Use a spacecraft's gravitational pull to slowly alter the orbit",
            effectiveness: 0.9,
            min_time_required_days: 365,
            technology_readiness: "theoretical",
            example: "None (proposed concept)",
        },
        StrategyInfo {
            id: DeflectionStrategy::LaserAblation.id(),
            name: "Laser Ablation",
            description: "Vaporize surface material with a laser to create thrust",
            effectiveness: 0.7,
            min_time_required_days: 270,
            technology_readiness: "experimental",
            example: "DE-STAR concept",
        },
    ]
}
