//! Infinite scroll: decide when to ask the host for the next page.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// Remaining scroll distance, in units, under which the next page is requested.
pub const DEFAULT_SCROLL_THRESHOLD: u32 = 200;

/// Safety net after which the in-flight guard releases on its own.
pub const DEFAULT_LOAD_COOLDOWN: Duration = Duration::from_secs(1);

/// Geometry of the scrollable viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: u32,
    pub client_height: u32,
    pub scroll_height: u32,
}

impl ScrollMetrics {
    pub fn new(scroll_top: u32, client_height: u32, scroll_height: u32) -> Self {
        Self {
            scroll_top,
            client_height,
            scroll_height,
        }
    }

    /// Whether `scroll_top + client_height >= scroll_height - threshold`.
    pub fn near_end(&self, threshold: u32) -> bool {
        self.scroll_top.saturating_add(self.client_height)
            >= self.scroll_height.saturating_sub(threshold)
    }
}

/// Loading flags reported by the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadState {
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub has_more_data: bool,
}

impl LoadState {
    pub fn busy(&self) -> bool {
        self.is_loading || self.is_loading_more
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    since: Instant,
    /// Set once the host has reported a load in progress for this trigger.
    host_acknowledged: bool,
}

/// Single in-flight guard plus cool-down. Not a queue: a trigger while in
/// flight is dropped.
#[derive(Debug, Clone)]
pub struct InfiniteScroll {
    threshold: u32,
    cooldown: Duration,
    in_flight: Option<InFlight>,
}

impl InfiniteScroll {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            in_flight: None,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Whether a trigger is outstanding at `now`.
    pub fn is_in_flight(&self, now: Instant) -> bool {
        self.in_flight
            .map(|f| now.saturating_duration_since(f.since) < self.cooldown)
            .unwrap_or(false)
    }

    /// Evaluate a scroll event. Returns `true` if the host should load the
    /// next page now.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, load: LoadState, now: Instant) -> bool {
        if !metrics.near_end(self.threshold) {
            return false;
        }
        if load.busy() || !load.has_more_data {
            trace!(?load, "Near end but not loading");
            return false;
        }
        if self.is_in_flight(now) {
            trace!("Near end but a page request is already in flight");
            return false;
        }
        debug!(
            scroll_top = metrics.scroll_top,
            scroll_height = metrics.scroll_height,
            "Requesting next page"
        );
        self.in_flight = Some(InFlight {
            since: now,
            host_acknowledged: false,
        });
        true
    }

    /// Observe the host's loading flags. The guard is released when a load
    /// the host acknowledged has finished, or once the cool-down has passed.
    pub fn sync(&mut self, load: LoadState, now: Instant) {
        let Some(mut flight) = self.in_flight else {
            return;
        };
        if load.busy() {
            flight.host_acknowledged = true;
            self.in_flight = Some(flight);
        } else if flight.host_acknowledged
            || now.saturating_duration_since(flight.since) >= self.cooldown
        {
            trace!("Releasing infinite scroll guard");
            self.in_flight = None;
        }
    }

    /// Drop any outstanding guard (data set replaced).
    pub fn reset(&mut self) {
        self.in_flight = None;
    }
}

impl Default for InfiniteScroll {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_THRESHOLD, DEFAULT_LOAD_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> LoadState {
        LoadState {
            is_loading: false,
            is_loading_more: false,
            has_more_data: true,
        }
    }

    fn loading_more() -> LoadState {
        LoadState {
            is_loading_more: true,
            ..ready()
        }
    }

    /// Scrolled to within 150 units of the bottom.
    fn near_bottom() -> ScrollMetrics {
        ScrollMetrics::new(1650, 400, 2200)
    }

    #[test]
    fn test_near_end() {
        assert!(ScrollMetrics::new(1600, 400, 2200).near_end(200));
        assert!(!ScrollMetrics::new(1599, 400, 2200).near_end(200));
        // Content shorter than the viewport is always at the end
        assert!(ScrollMetrics::new(0, 400, 100).near_end(200));
    }

    #[test]
    fn test_triggers_once_near_bottom() {
        let mut scroll = InfiniteScroll::default();
        let t0 = Instant::now();

        assert!(scroll.on_scroll(near_bottom(), ready(), t0));
        // A second scroll 50ms later, before the host flips isLoadingMore
        assert!(!scroll.on_scroll(near_bottom(), ready(), t0 + Duration::from_millis(50)));
    }

    #[test]
    fn test_sync_before_host_acknowledges_keeps_guard() {
        let mut scroll = InfiniteScroll::default();
        let t0 = Instant::now();
        scroll.on_scroll(near_bottom(), ready(), t0);

        scroll.sync(ready(), t0 + Duration::from_millis(10));
        assert!(scroll.is_in_flight(t0 + Duration::from_millis(10)));
    }

    #[test]
    fn test_guard_released_when_load_finishes() {
        let mut scroll = InfiniteScroll::default();
        let t0 = Instant::now();
        scroll.on_scroll(near_bottom(), ready(), t0);

        scroll.sync(loading_more(), t0 + Duration::from_millis(10));
        assert!(!scroll.on_scroll(near_bottom(), loading_more(), t0 + Duration::from_millis(20)));

        scroll.sync(ready(), t0 + Duration::from_millis(300));
        assert!(!scroll.is_in_flight(t0 + Duration::from_millis(300)));
        assert!(scroll.on_scroll(near_bottom(), ready(), t0 + Duration::from_millis(310)));
    }

    #[test]
    fn test_cooldown_releases_guard() {
        let mut scroll = InfiniteScroll::default();
        let t0 = Instant::now();
        scroll.on_scroll(near_bottom(), ready(), t0);

        // Host never reports loading; the cool-down is the safety net
        assert!(!scroll.on_scroll(near_bottom(), ready(), t0 + Duration::from_millis(999)));
        assert!(scroll.on_scroll(near_bottom(), ready(), t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn test_many_scroll_events_trigger_once() {
        let mut scroll = InfiniteScroll::default();
        let t0 = Instant::now();
        let triggers = (0..50)
            .filter(|i| scroll.on_scroll(near_bottom(), ready(), t0 + Duration::from_millis(*i * 10)))
            .count();
        assert_eq!(triggers, 1);
    }

    #[test]
    fn test_no_trigger_without_more_data_or_while_loading() {
        let mut scroll = InfiniteScroll::default();
        let t0 = Instant::now();
        let exhausted = LoadState {
            has_more_data: false,
            ..ready()
        };
        let initial_load = LoadState {
            is_loading: true,
            ..ready()
        };
        assert!(!scroll.on_scroll(near_bottom(), exhausted, t0));
        assert!(!scroll.on_scroll(near_bottom(), initial_load, t0));
        assert!(!scroll.on_scroll(near_bottom(), loading_more(), t0));
        assert!(!scroll.on_scroll(ScrollMetrics::new(0, 400, 2200), ready(), t0));
    }

    #[test]
    fn test_reset() {
        let mut scroll = InfiniteScroll::default();
        let t0 = Instant::now();
        scroll.on_scroll(near_bottom(), ready(), t0);
        scroll.reset();
        assert!(scroll.on_scroll(near_bottom(), ready(), t0));
    }
}
