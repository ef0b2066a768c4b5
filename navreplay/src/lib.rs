//! NavReplay - route request coordination and trip history replay
//!
//! This library owns the current set of navigation routes for a session and
//! replays recorded trip histories with their original timing, so a
//! navigation stack can be exercised without a device in motion.
//!
//! # Modules
//!
//! - [`directions`]: route session, request handles and observers
//! - [`history`]: recorded log loading and mapping to typed events
//! - [`replay`]: time-faithful playback and the feeds it drives
//! - [`location`]: location observer fanout shared by live and replayed sources
//! - [`router`]: the backend seam route requests go through
//! - [`config`] / [`logging`]: INI configuration and tracing setup

pub mod config;
pub mod directions;
pub mod geo;
pub mod history;
pub mod location;
pub mod logging;
pub mod observer;
pub mod replay;
pub mod route;
pub mod router;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
