//! Route request descriptions and route sets.
//!
//! - [`RouteOptions`] - immutable description of one routing request
//! - [`DirectionsRoute`] - a single candidate route returned by a router
//! - [`RouteSet`] - ordered candidates for one request, primary first
//!
//! `RouteOptions` is compared by reference identity only. Two options built
//! from identical values are different requests; a clone is the same request.

use std::fmt;
use std::sync::Arc;

use crate::geo::Point;

/// Routing profile requested from the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoutingProfile {
    /// Driving with live traffic.
    #[default]
    DrivingTraffic,
    /// Driving without traffic.
    Driving,
    /// Walking.
    Walking,
    /// Cycling.
    Cycling,
}

impl RoutingProfile {
    /// Profile identifier as used in routing requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingProfile::DrivingTraffic => "driving-traffic",
            RoutingProfile::Driving => "driving",
            RoutingProfile::Walking => "walking",
            RoutingProfile::Cycling => "cycling",
        }
    }
}

#[derive(Debug)]
struct RouteOptionsInner {
    coordinates: Vec<Point>,
    profile: RoutingProfile,
    alternatives: bool,
    language: Option<String>,
    annotations: Vec<String>,
}

/// Immutable description of a routing request.
///
/// Cheap to clone; clones share identity (see [`RouteOptions::same_request`]).
#[derive(Clone)]
pub struct RouteOptions {
    inner: Arc<RouteOptionsInner>,
}

impl RouteOptions {
    /// Start building route options.
    pub fn builder() -> RouteOptionsBuilder {
        RouteOptionsBuilder::default()
    }

    /// Waypoints in travel order: origin, optional intermediates, destination.
    pub fn coordinates(&self) -> &[Point] {
        &self.inner.coordinates
    }

    /// Origin waypoint, if any.
    pub fn origin(&self) -> Option<Point> {
        self.inner.coordinates.first().copied()
    }

    /// Destination waypoint, if any.
    pub fn destination(&self) -> Option<Point> {
        self.inner.coordinates.last().copied()
    }

    /// Routing profile.
    pub fn profile(&self) -> RoutingProfile {
        self.inner.profile
    }

    /// Whether alternative routes were requested.
    pub fn alternatives(&self) -> bool {
        self.inner.alternatives
    }

    /// Instruction language, if set.
    pub fn language(&self) -> Option<&str> {
        self.inner.language.as_deref()
    }

    /// Requested per-segment annotations.
    pub fn annotations(&self) -> &[String] {
        &self.inner.annotations
    }

    /// True if both values describe the very same request instance.
    pub fn same_request(&self, other: &RouteOptions) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Derive new options from these with a different origin.
    ///
    /// The result is a distinct request. Used when re-routing or probing for
    /// a faster route from the current position.
    pub fn with_origin(&self, origin: Point) -> RouteOptions {
        let mut coordinates = self.inner.coordinates.clone();
        match coordinates.first_mut() {
            Some(first) => *first = origin,
            None => coordinates.push(origin),
        }
        RouteOptions {
            inner: Arc::new(RouteOptionsInner {
                coordinates,
                profile: self.inner.profile,
                alternatives: self.inner.alternatives,
                language: self.inner.language.clone(),
                annotations: self.inner.annotations.clone(),
            }),
        }
    }
}

impl fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptions")
            .field("coordinates", &self.inner.coordinates)
            .field("profile", &self.inner.profile)
            .field("alternatives", &self.inner.alternatives)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RouteOptions`].
#[derive(Debug, Default)]
pub struct RouteOptionsBuilder {
    coordinates: Vec<Point>,
    profile: RoutingProfile,
    alternatives: bool,
    language: Option<String>,
    annotations: Vec<String>,
}

impl RouteOptionsBuilder {
    /// Set origin, optional waypoints and destination in one call.
    pub fn coordinates(
        mut self,
        origin: Point,
        waypoints: impl IntoIterator<Item = Point>,
        destination: Point,
    ) -> Self {
        self.coordinates.clear();
        self.coordinates.push(origin);
        self.coordinates.extend(waypoints);
        self.coordinates.push(destination);
        self
    }

    /// Set the routing profile.
    pub fn profile(mut self, profile: RoutingProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Request alternative routes.
    pub fn alternatives(mut self, alternatives: bool) -> Self {
        self.alternatives = alternatives;
        self
    }

    /// Set the instruction language.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Add a per-segment annotation.
    pub fn annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Finish building.
    pub fn build(self) -> RouteOptions {
        RouteOptions {
            inner: Arc::new(RouteOptionsInner {
                coordinates: self.coordinates,
                profile: self.profile,
                alternatives: self.alternatives,
                language: self.language,
                annotations: self.annotations,
            }),
        }
    }
}

/// A single candidate route.
#[derive(Debug, Clone)]
pub struct DirectionsRoute {
    /// Position of this route within the response that produced it.
    pub route_index: usize,
    /// Length in meters.
    pub distance: f64,
    /// Expected travel time in seconds.
    pub duration: f64,
    /// Route geometry.
    pub geometry: Vec<Point>,
    /// Number of legs (one per waypoint pair).
    pub leg_count: usize,
    /// Options of the request that produced this route.
    pub route_options: Option<RouteOptions>,
}

impl DirectionsRoute {
    /// Options of the request that produced this route.
    pub fn route_options(&self) -> Option<&RouteOptions> {
        self.route_options.as_ref()
    }
}

/// Ordered candidate routes for one request; the first is the primary route.
///
/// A route set is never mutated after construction. The empty set is valid and
/// means "no active route".
#[derive(Debug, Clone, Default)]
pub struct RouteSet {
    routes: Arc<[DirectionsRoute]>,
}

impl RouteSet {
    /// The empty route set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True if there is no active route.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Number of candidate routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// The primary route, if any.
    pub fn primary(&self) -> Option<&DirectionsRoute> {
        self.routes.first()
    }

    /// Iterate routes in order, primary first.
    pub fn iter(&self) -> std::slice::Iter<'_, DirectionsRoute> {
        self.routes.iter()
    }

    /// Routes as a slice.
    pub fn as_slice(&self) -> &[DirectionsRoute] {
        &self.routes
    }

    /// True if both values are the very same set instance.
    pub fn ptr_eq(&self, other: &RouteSet) -> bool {
        Arc::ptr_eq(&self.routes, &other.routes)
    }
}

impl From<Vec<DirectionsRoute>> for RouteSet {
    fn from(routes: Vec<DirectionsRoute>) -> Self {
        Self {
            routes: routes.into(),
        }
    }
}

impl<'a> IntoIterator for &'a RouteSet {
    type Item = &'a DirectionsRoute;
    type IntoIter = std::slice::Iter<'a, DirectionsRoute>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}
