//! In-process demo router.
//!
//! Answers every request with one route that runs in straight lines between
//! the requested waypoints. Good enough to exercise a route session while
//! replaying, without a routing backend.

use std::time::Duration;

use navreplay::route::{DirectionsRoute, RouteOptions, RouteSet};
use navreplay::router::{Router, RouterError, RouterFuture};

/// Assumed travel speed for route durations (about 50 km/h).
const DEFAULT_SPEED_MPS: f64 = 13.9;

/// Straight-line router with a simulated response latency.
#[derive(Debug, Clone)]
pub struct DirectLineRouter {
    latency: Duration,
    speed_mps: f64,
}

impl DirectLineRouter {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            speed_mps: DEFAULT_SPEED_MPS,
        }
    }

    fn build_route(&self, options: &RouteOptions) -> Result<DirectionsRoute, RouterError> {
        let coordinates = options.coordinates();
        if coordinates.len() < 2 {
            return Err(RouterError::InvalidRequest(format!(
                "need at least 2 waypoints, got {}",
                coordinates.len()
            )));
        }

        let distance: f64 = coordinates
            .windows(2)
            .map(|leg| leg[0].distance_to(&leg[1]))
            .sum();

        Ok(DirectionsRoute {
            route_index: 0,
            distance,
            duration: distance / self.speed_mps,
            geometry: coordinates.to_vec(),
            leg_count: coordinates.len() - 1,
            route_options: Some(options.clone()),
        })
    }
}

impl Router for DirectLineRouter {
    fn get_route(&self, options: RouteOptions) -> RouterFuture<RouteSet> {
        let latency = self.latency;
        let result = self.build_route(&options);
        Box::pin(async move {
            tokio::time::sleep(latency).await;
            result.map(|route| RouteSet::from(vec![route]))
        })
    }

    fn get_route_refresh(
        &self,
        route: DirectionsRoute,
        _leg_index: usize,
    ) -> RouterFuture<DirectionsRoute> {
        let latency = self.latency;
        Box::pin(async move {
            tokio::time::sleep(latency).await;
            Ok(route)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navreplay::geo::Point;

    #[tokio::test]
    async fn test_straight_line_route() {
        let router = DirectLineRouter::new(Duration::ZERO);
        let options = RouteOptions::builder()
            .coordinates(Point::new(52.0, 13.0), None, Point::new(52.01, 13.0))
            .build();

        let routes = router.get_route(options.clone()).await.unwrap();
        let route = routes.primary().unwrap();
        assert_eq!(route.leg_count, 1);
        assert!((route.distance - 1112.0).abs() < 5.0);
        assert!(route.route_options().unwrap().same_request(&options));
    }

    #[tokio::test]
    async fn test_missing_waypoints_rejected() {
        let router = DirectLineRouter::new(Duration::ZERO);
        let result = router.get_route(RouteOptions::builder().build()).await;
        assert!(matches!(result, Err(RouterError::InvalidRequest(_))));
    }
}
