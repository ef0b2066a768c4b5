//! Geographic primitives shared by routing and replay.
//!
//! Provides a plain coordinate pair ([`Point`]) and a timestamped device
//! sample ([`Location`]) in the shape consumed by location feeds, whether the
//! sample came from a live provider or from a replayed recording.
//!
//! # Wire Order
//!
//! Recorded route coordinates are stored longitude first (`[lon, lat]`),
//! matching GeoJSON. [`Point::from_lon_lat_pair`] is the only place that
//! ordering is interpreted.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Point {
    /// Create a new point from latitude and longitude.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a point from a longitude-first pair as found in recorded routes.
    ///
    /// Returns `None` if the slice does not hold at least two values.
    pub fn from_lon_lat_pair(pair: &[f64]) -> Option<Self> {
        match pair {
            [lon, lat, ..] => Some(Self::new(*lat, *lon)),
            _ => None,
        }
    }

    /// Great-circle distance to another point in meters.
    pub fn distance_to(&self, other: &Point) -> f64 {
        haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    /// Initial bearing towards another point in degrees (0-360, 0 = North).
    pub fn bearing_to(&self, other: &Point) -> f64 {
        initial_bearing(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A single location sample.
///
/// Fields mirror what a device provider reports. Everything except the
/// coordinate is optional because recordings omit values the provider did not
/// supply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Sample time in seconds since the recording epoch.
    pub time: f64,
    /// Ground speed in meters per second.
    pub speed: Option<f64>,
    /// Bearing in degrees.
    pub bearing: Option<f64>,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Horizontal accuracy radius in meters.
    pub accuracy_horizontal: Option<f64>,
    /// Name of the provider that produced the sample.
    pub provider: Option<String>,
}

impl Location {
    /// Create a location with only a coordinate and time.
    pub fn new(latitude: f64, longitude: f64, time: f64) -> Self {
        Self {
            latitude,
            longitude,
            time,
            speed: None,
            bearing: None,
            altitude: None,
            accuracy_horizontal: None,
            provider: None,
        }
    }

    /// Set the provider name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the ground speed.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Set the bearing.
    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    /// The coordinate of this sample.
    pub fn point(&self) -> Point {
        Point::new(self.latitude, self.longitude)
    }
}

/// Great-circle distance between two coordinates in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial great-circle bearing from one coordinate to another.
///
/// Returns degrees in `[0, 360)`, where 0 = North, 90 = East.
pub fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    let bearing_deg = y.atan2(x).to_degrees();

    // Normalize to 0-360
    if bearing_deg < 0.0 {
        bearing_deg + 360.0
    } else {
        bearing_deg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_from_lon_lat_pair() {
        let point = Point::from_lon_lat_pair(&[-122.4194, 37.7749]).unwrap();
        assert_eq!(point.latitude, 37.7749);
        assert_eq!(point.longitude, -122.4194);
    }

    #[test]
    fn test_point_from_short_pair() {
        assert!(Point::from_lon_lat_pair(&[1.0]).is_none());
        assert!(Point::from_lon_lat_pair(&[]).is_none());
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        // One degree of latitude is ~111.2 km everywhere
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn test_haversine_same_point_is_zero() {
        let p = Point::new(53.55, 9.99);
        assert!(p.distance_to(&p) < 1e-6);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = Point::new(0.0, 0.0);
        assert!((origin.bearing_to(&Point::new(1.0, 0.0)) - 0.0).abs() < 0.01);
        assert!((origin.bearing_to(&Point::new(0.0, 1.0)) - 90.0).abs() < 0.01);
        assert!((origin.bearing_to(&Point::new(-1.0, 0.0)) - 180.0).abs() < 0.01);
        assert!((origin.bearing_to(&Point::new(0.0, -1.0)) - 270.0).abs() < 0.01);
    }

    #[test]
    fn test_location_builder() {
        let location = Location::new(37.0, -122.0, 10.5)
            .with_provider("gps")
            .with_speed(12.0)
            .with_bearing(45.0);
        assert_eq!(location.provider.as_deref(), Some("gps"));
        assert_eq!(location.speed, Some(12.0));
        assert_eq!(location.point(), Point::new(37.0, -122.0));
    }
}
