// In-memory collaborators for tests; nothing here touches the network

pub mod fixtures {
    use crate::error::ApiError;
    use crate::impact_physics::ImpactParameters;
    use crate::population::{GeocodeAddress, ReverseGeocoder};
    use crate::terrain::{ElevationSample, TerrainSource};

    const FIXTURE_SOURCE: &str = "fixture";

    fn sample(lat: f64, lng: f64, elevation: f64) -> ElevationSample {
        ElevationSample {
            elevation,
            lat,
            lng,
            source: FIXTURE_SOURCE.to_string(),
            is_water: elevation < 0.0,
        }
    }

    /// 500 m stony asteroid at 20 km/s, 45°, over the US Great Plains
    pub fn reference_params() -> ImpactParameters {
        ImpactParameters::new(500.0, 3000.0, 20.0, 45.0, 40.0, -100.0)
    }

    /// Same elevation everywhere.
    pub struct FlatTerrain {
        elevation: f64,
    }

    impl FlatTerrain {
        pub fn new(elevation: f64) -> Self {
            Self { elevation }
        }
    }

    impl TerrainSource for FlatTerrain {
        async fn elevation(&self, lat: f64, lng: f64) -> Result<ElevationSample, ApiError> {
            Ok(sample(lat, lng, self.elevation))
        }
    }

    /// Default elevation with exact-coordinate overrides.
    pub struct GridTerrain {
        default: f64,
        points: Vec<(f64, f64, f64)>,
    }

    impl GridTerrain {
        pub fn new(default: f64) -> Self {
            Self {
                default,
                points: Vec::new(),
            }
        }

        pub fn with_point(mut self, lat: f64, lng: f64, elevation: f64) -> Self {
            self.points.push((lat, lng, elevation));
            self
        }
    }

    impl TerrainSource for GridTerrain {
        async fn elevation(&self, lat: f64, lng: f64) -> Result<ElevationSample, ApiError> {
            let elevation = self
                .points
                .iter()
                .find(|(p_lat, p_lng, _)| (p_lat - lat).abs() < 1e-9 && (p_lng - lng).abs() < 1e-9)
                .map(|(_, _, e)| *e)
                .unwrap_or(self.default);
            Ok(sample(lat, lng, elevation))
        }
    }

    /// Elevation service that is always down.
    pub struct FailingTerrain;

    impl TerrainSource for FailingTerrain {
        async fn elevation(&self, _lat: f64, _lng: f64) -> Result<ElevationSample, ApiError> {
            Err(ApiError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
        }
    }

    pub struct FixedGeocoder {
        address: GeocodeAddress,
    }

    impl FixedGeocoder {
        pub fn new(address: GeocodeAddress) -> Self {
            Self { address }
        }
    }

    impl ReverseGeocoder for FixedGeocoder {
        async fn reverse_geocode(&self, _lat: f64, _lng: f64) -> Result<GeocodeAddress, ApiError> {
            Ok(self.address.clone())
        }
    }

    pub struct FailingGeocoder;

    impl ReverseGeocoder for FailingGeocoder {
        async fn reverse_geocode(&self, _lat: f64, _lng: f64) -> Result<GeocodeAddress, ApiError> {
            Err(ApiError::Parse("geocoder offline".to_string()))
        }
    }
}
