use crate::{define_index_newtype, problem::amount::Amount};

define_index_newtype!(LocationIdx, Location);

/// Index of the depot, every route starts and ends there.
pub const DEPOT: LocationIdx = LocationIdx::new(0);

#[derive(Debug, Clone)]
pub struct Location {
    external_id: String,
    point: geo::Point,
    demand: Amount,
    /// Demand as received, kept for output
    raw_demand: f64,
}

impl Location {
    pub fn new(external_id: String, lat: f64, lon: f64, raw_demand: f64, demand: Amount) -> Self {
        Self {
            external_id,
            point: geo::Point::new(lon, lat),
            demand,
            raw_demand,
        }
    }

    pub fn depot(lat: f64, lon: f64) -> Self {
        Self::new("depot".to_owned(), lat, lon, 0.0, Amount::ZERO)
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn point(&self) -> geo::Point {
        self.point
    }

    pub fn demand(&self) -> Amount {
        self.demand
    }

    pub fn raw_demand(&self) -> f64 {
        self.raw_demand
    }
}

pub fn is_valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

impl From<&Location> for geo::Point<f64> {
    fn from(location: &Location) -> Self {
        location.point
    }
}
