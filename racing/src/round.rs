use std::sync::atomic::{AtomicBool, Ordering};

use race_protocol::RoundEnd;
use tracing::info;

use crate::controller::Controller;
use crate::population::{Population, TickStatus};
use crate::track::TrackSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    pub ticks: u64,
    pub end: RoundEnd,
}

/// Drives a population tick by tick until it dies out or is told to stop.
pub struct Round<'a> {
    track: &'a TrackSurface,
    tick_limit: Option<u64>,
}

impl<'a> Round<'a> {
    pub fn new(track: &'a TrackSurface) -> Self {
        Self {
            track,
            tick_limit: None,
        }
    }

    pub fn with_tick_limit(mut self, tick_limit: u64) -> Self {
        self.tick_limit = Some(tick_limit);
        self
    }

    /// Runs ticks until every car is gone, `stop` is raised, or the tick limit
    /// is reached. `stop` is only looked at between ticks.
    pub fn run<C: Controller>(
        &self,
        population: &mut Population<C>,
        stop: &AtomicBool,
    ) -> RoundOutcome {
        info!(cars = population.len(), "round started");

        let mut ticks = 0u64;
        let end = loop {
            if population.is_empty() {
                break RoundEnd::AllCrashed;
            }
            if stop.load(Ordering::Relaxed) {
                break RoundEnd::Stopped;
            }
            if self.tick_limit.is_some_and(|limit| ticks >= limit) {
                break RoundEnd::TickLimit;
            }

            ticks += 1;
            if population.tick(self.track) == TickStatus::RoundOver {
                break RoundEnd::AllCrashed;
            }
        };

        info!(ticks, ?end, remaining = population.len(), "round finished");
        RoundOutcome { ticks, end }
    }
}
