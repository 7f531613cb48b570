// Error types shared across the impact engine
// Collaborator failures are ApiError; bad inputs are ParameterError

/// Failures raised by the HTTP collaborators (USGS, Nominatim, NeoWs, remote backend).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned status: {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("response missing field `{0}`")]
    MissingField(&'static str),
}

/// Rejected simulation or deflection inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("asteroid size must be a positive finite number of meters (got {0})")]
    Size(f64),

    #[error("density must be a positive finite number of kg/m³ (got {0})")]
    Density(f64),

    #[error("velocity must be a positive finite number of km/s (got {0})")]
    Velocity(f64),

    #[error("entry angle must lie in [0, 90] degrees (got {0})")]
    Angle(f64),

    #[error("latitude must lie in [-90, 90] degrees (got {0})")]
    Latitude(f64),

    #[error("longitude must lie in [-180, 180] degrees (got {0})")]
    Longitude(f64),

    #[error("asteroid mass must be a positive finite number of kg (got {0})")]
    Mass(f64),

    #[error("time available must be a non-negative number of days (got {0})")]
    TimeAvailable(f64),
}

/// The only error a simulation call surfaces; every collaborator failure degrades instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid impact parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
}

/// Outcome of a lookup that may have degraded to a default guess.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Value came from the real data source.
    Found(T),
    /// Source was unavailable; value is the documented fallback.
    Fallback(T),
}

impl<T> Lookup<T> {
    pub fn value(&self) -> &T {
        match self {
            Lookup::Found(v) | Lookup::Fallback(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Lookup::Found(v) | Lookup::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Lookup::Fallback(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::Fallback(v) => Lookup::Fallback(f(v)),
        }
    }
}
