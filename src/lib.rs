// Asteroid Impact - impact effects and deflection engine
// Library entry point: physics calculators, collaborator adapters, simulation pipeline

pub mod api_client;
pub mod cache;
pub mod config;
pub mod deflection;
pub mod error;
pub mod impact_physics;
pub mod logging;
pub mod orbital_mechanics;
pub mod population;
pub mod simulation;
pub mod terrain;

#[cfg(test)]
mod proptest_physics;
#[cfg(test)]
mod test_utils;

pub use config::SimulatorConfig;
pub use error::{ApiError, Lookup, ParameterError, SimulationError};
pub use impact_physics::{GeoPoint, ImpactParameters};
pub use orbital_mechanics::{OrbitData, OrbitError};
pub use simulation::{ImpactResults, ImpactSimulator, LocalSimulator, RemoteSimulator, Simulator};
