//! Loading indicator and fake progress for in-flight generations.
//!
//! Every submission holds a [`LoadingGuard`]. The indicator is on while at
//! least one guard is alive; dropping a guard stops its progress ticker
//! whatever the outcome of the call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aimg_core::progress::{FakeProgress, PROGRESS_CEILING};
use aimg_events::{ConsoleEvent, EventBus};
use tokio::task::JoinHandle;

pub struct LoadingTracker {
    active: AtomicUsize,
    bus: Arc<EventBus>,
    tick_interval: Duration,
}

impl LoadingTracker {
    pub fn new(bus: Arc<EventBus>, tick_interval: Duration) -> Self {
        Self {
            active: AtomicUsize::new(0),
            bus,
            tick_interval,
        }
    }

    /// Number of submissions currently in flight.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Start tracking submission `request`. Must be called inside a tokio
    /// runtime (the progress ticker is a spawned task).
    pub fn start(&self, request: u64) -> LoadingGuard<'_> {
        if self.active.fetch_add(1, Ordering::SeqCst) == 0 {
            self.bus.publish(ConsoleEvent::LoadingChanged { active: true });
        }
        self.bus.publish(ConsoleEvent::Progress {
            request,
            percent: 0.0,
        });
        LoadingGuard {
            tracker: self,
            request,
            ticker: spawn_ticker(self.bus.clone(), request, self.tick_interval),
        }
    }
}

fn spawn_ticker(bus: Arc<EventBus>, request: u64, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut progress = FakeProgress::new();
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let percent = progress.tick();
            bus.publish(ConsoleEvent::Progress { request, percent });
            if percent >= PROGRESS_CEILING {
                break;
            }
        }
    })
}

/// Scoped loading state of one submission.
pub struct LoadingGuard<'a> {
    tracker: &'a LoadingTracker,
    request: u64,
    ticker: JoinHandle<()>,
}

impl LoadingGuard<'_> {
    pub fn request(&self) -> u64 {
        self.request
    }

    /// Stop the ticker and report completion.
    pub fn complete(&self) {
        self.ticker.abort();
        self.tracker.bus.publish(ConsoleEvent::Progress {
            request: self.request,
            percent: 100.0,
        });
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.ticker.abort();
        if self.tracker.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker
                .bus
                .publish(ConsoleEvent::LoadingChanged { active: false });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn indicator_stays_on_until_last_guard_drops() {
        let bus = Arc::new(EventBus::default());
        let tracker = LoadingTracker::new(bus.clone(), Duration::from_secs(3600));
        let mut rx = bus.subscribe();

        let first = tracker.start(1);
        let second = tracker.start(2);
        assert_eq!(tracker.active(), 2);
        drop(first);
        assert_eq!(tracker.active(), 1);
        drop(second);
        assert_eq!(tracker.active(), 0);

        let mut loading = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ConsoleEvent::LoadingChanged { active } = event {
                loading.push(active);
            }
        }
        assert_eq!(loading, vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_advances_and_stops_at_ceiling() {
        let bus = Arc::new(EventBus::default());
        let tracker = LoadingTracker::new(bus.clone(), Duration::from_millis(100));
        let mut rx = bus.subscribe();

        let guard = tracker.start(7);
        let mut last = 0.0;
        let mut ticks = 0;
        // Steps average 5%, so the ceiling is reached well within 500 ticks.
        while ticks < 500 {
            match rx.recv().await.unwrap() {
                ConsoleEvent::Progress { request, percent } => {
                    assert_eq!(request, 7);
                    assert!(percent >= last && percent <= PROGRESS_CEILING);
                    last = percent;
                    if percent >= PROGRESS_CEILING {
                        break;
                    }
                }
                _ => continue,
            }
            ticks += 1;
        }
        assert_eq!(last, PROGRESS_CEILING);
        guard.complete();
    }
}
