//! Per-session clock

use crate::app::event::SessionEvent;
use crate::services::time_source::SharedTimeSource;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Sends [`SessionEvent::Tick`] into a session at a fixed interval.
///
/// The timer task stops when the receiving loop is gone, and is aborted when
/// the `Ticker` is dropped, so it never outlives its session.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Must be called from within a tokio runtime
    pub fn spawn(
        events: Sender<SessionEvent>,
        period: Duration,
        time_source: SharedTimeSource,
    ) -> Self {
        let handle = tokio::spawn(async move {
            // First tick one period from now, not immediately
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);

            loop {
                interval.tick().await;
                if events
                    .send(SessionEvent::Tick(time_source.wall_clock()))
                    .await
                    .is_err()
                {
                    tracing::trace!("Session gone, stopping ticker");
                    break;
                }
            }
        });

        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::time_source::{TestTimeSource, TimeSource};
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let (tx, mut rx) = mpsc::channel(16);
        let time = TestTimeSource::shared();
        let _ticker = Ticker::spawn(tx, DEFAULT_TICK_INTERVAL, time.clone());

        tokio::time::sleep(Duration::from_millis(3500)).await;

        let mut ticks = 0;
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event, SessionEvent::Tick(time.wall_clock()));
            ticks += 1;
        }
        assert_eq!(ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(16);
        let ticker = Ticker::spawn(tx, DEFAULT_TICK_INTERVAL, TestTimeSource::shared());

        drop(rx);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(ticker.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_timer() {
        let (tx, mut rx) = mpsc::channel(16);
        let ticker = Ticker::spawn(tx, DEFAULT_TICK_INTERVAL, TestTimeSource::shared());

        drop(ticker);
        tokio::time::sleep(Duration::from_secs(5)).await;

        // The aborted task dropped its sender without sending anything
        assert_eq!(rx.recv().await, None);
    }
}
