use crate::TipSelCounters;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tangle_core::{
    info,
    task::{
        service::{AsyncService, AsyncServiceFuture},
        tick::{TickReason, TickService},
    },
    trace, warn,
};

const MONITOR: &str = "tip-selection-monitor";

pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(10);

pub struct TipSelectionMonitor {
    counters: Arc<TipSelCounters>,
    tick_service: Arc<TickService>,
    snapshot_interval: Duration,
}

impl TipSelectionMonitor {
    pub fn new(counters: Arc<TipSelCounters>, tick_service: Arc<TickService>) -> Self {
        Self::with_interval(counters, tick_service, DEFAULT_SNAPSHOT_INTERVAL)
    }

    pub fn with_interval(counters: Arc<TipSelCounters>, tick_service: Arc<TickService>, snapshot_interval: Duration) -> Self {
        Self { counters, tick_service, snapshot_interval }
    }

    pub async fn worker(self: &Arc<TipSelectionMonitor>) {
        let mut last_snapshot = self.counters.snapshot();
        let mut last_log_time = Instant::now();
        loop {
            if let TickReason::Shutdown = self.tick_service.tick(self.snapshot_interval).await {
                break;
            }

            let snapshot = self.counters.snapshot();
            if snapshot == last_snapshot {
                // No update, avoid printing useless info
                last_log_time = Instant::now();
                continue;
            }

            // Subtract the snapshots
            let delta = &snapshot - &last_snapshot;
            let now = Instant::now();

            info!(
                "Tip pools hold {} non-lazy and {} semi-lazy tips, {} added and {} removed in the last {:.2}s ({} selections)",
                delta.non_lazy_tips,
                delta.semi_lazy_tips,
                delta.tips_added,
                delta.tips_removed,
                (now - last_log_time).as_secs_f64(),
                delta.selections,
            );
            if delta.dropped_events > 0 {
                warn!("{} tip selection events were dropped by lagging subscribers", delta.dropped_events);
            }

            last_snapshot = snapshot;
            last_log_time = now;
        }

        trace!("{} exiting", MONITOR);
    }
}

impl AsyncService for TipSelectionMonitor {
    fn ident(self: Arc<Self>) -> &'static str {
        MONITOR
    }

    fn start(self: Arc<Self>) -> AsyncServiceFuture {
        Box::pin(async move {
            self.worker().await;
            Ok(())
        })
    }

    fn signal_exit(self: Arc<Self>) {
        trace!("sending an exit signal to {}", MONITOR);
        self.tick_service.shutdown();
    }

    fn stop(self: Arc<Self>) -> AsyncServiceFuture {
        Box::pin(async move {
            trace!("{} stopped", MONITOR);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_monitor_exits_on_signal() {
        let counters = Arc::new(TipSelCounters::default());
        let monitor =
            Arc::new(TipSelectionMonitor::with_interval(counters.clone(), Arc::new(TickService::new()), Duration::from_millis(5)));
        let handle = tokio::spawn(monitor.clone().start());

        counters.tips_added.fetch_add(3, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(20)).await;
        monitor.clone().signal_exit();
        assert!(handle.await.unwrap().is_ok());
    }
}
