//! Replayed location source.

use std::sync::Arc;

use tracing::debug;

use super::player::{ReplayEvents, ReplayHistoryPlayer};
use crate::geo::Location;
use crate::location::LocationFeed;
use crate::observer::ObserverId;

/// Feeds `UpdateLocation` events from a player into a [`LocationFeed`].
///
/// Consumers of the feed cannot tell replayed samples from live ones. When a
/// batch carries several locations the last is reported and all of them are
/// passed as key points.
#[derive(Debug)]
pub struct ReplayLocationEngine {
    feed: Arc<LocationFeed>,
    player: ReplayHistoryPlayer,
    observer: ObserverId,
}

impl ReplayLocationEngine {
    /// Start forwarding the player's locations into `feed`.
    pub fn attach(player: &ReplayHistoryPlayer, feed: Arc<LocationFeed>) -> Self {
        let sink = Arc::clone(&feed);
        let observer = player.observe_replay_events(Arc::new(move |batch: &ReplayEvents| {
            publish_batch(&sink, batch);
        }));
        debug!(observer = %observer, "Replay location engine attached");
        Self {
            feed,
            player: player.clone(),
            observer,
        }
    }

    /// The feed this engine publishes into.
    pub fn feed(&self) -> &Arc<LocationFeed> {
        &self.feed
    }

    /// Last replayed sample.
    pub fn last_location(&self) -> Option<Location> {
        self.feed.last_location()
    }

    /// Stop forwarding. The feed keeps its observers.
    pub fn detach(self) {
        self.player.unobserve_replay_events(self.observer);
    }
}

fn publish_batch(feed: &LocationFeed, batch: &ReplayEvents) {
    let locations: Vec<Location> = batch.locations().cloned().collect();
    let Some(last) = locations.last().cloned() else {
        return;
    };
    let key_points: &[Location] = if locations.len() > 1 { &locations } else { &[] };
    feed.publish(last, key_points);
}
