use super::{
    issuer::{BlockIssuer, IssuerStats},
    tangle::SimTangle,
};
use async_channel::{unbounded, Receiver};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
    time::Duration,
};
use tangle_core::{
    info,
    task::{service::AsyncService, tick::TickService},
    warn,
};
use tangle_tipselect::{
    config::Config,
    events::TipSelectionEvent,
    monitor::TipSelectionMonitor,
    service::{TipSelectionService, DEFAULT_CLEANUP_INTERVAL},
    TipSelCounters, TipSelCountersSnapshot, TipSelector,
};

const EVENTS_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
pub struct SimulationParams {
    pub bps: f64,
    pub sim_time: Duration,
    pub milestone_interval: u64,
    pub spammer_share: f64,
    pub seed: Option<u64>,
    /// Periodically log the tip pool counters
    pub monitor: bool,
}

impl SimulationParams {
    pub fn blocks(&self) -> u64 {
        (self.bps * self.sim_time.as_secs_f64()).ceil() as u64
    }

    pub fn block_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.bps)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionStats {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

impl SelectionStats {
    fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total += duration;
        self.max = self.max.max(duration);
    }

    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        self.total / self.count as u32
    }
}

#[derive(Clone, Debug)]
pub struct Report {
    pub issuer: IssuerStats,
    pub selections: SelectionStats,
    pub counters: TipSelCountersSnapshot,
    pub non_lazy_tips: usize,
    pub semi_lazy_tips: usize,
    pub tangle_size: usize,
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "[Issued] blocks: {}, spam blocks: {}, milestones: {}, fallback blocks: {}, tangle size: {}",
            self.issuer.blocks, self.issuer.spam_blocks, self.issuer.milestones, self.issuer.fallback_blocks, self.tangle_size
        )?;
        writeln!(
            f,
            "[Tip pools] non-lazy: {}, semi-lazy: {}, added: {}, removed: {}, dropped events: {}",
            self.non_lazy_tips, self.semi_lazy_tips, self.counters.tips_added, self.counters.tips_removed, self.counters.dropped_events
        )?;
        write!(f, "[Selections] count: {}, mean: {:?}, max: {:?}", self.selections.count, self.selections.mean(), self.selections.max)
    }
}

/// Runs a node with the tip selection service on a simulated tangle
pub struct TangleSimulator {
    config: Config,
    params: SimulationParams,
}

impl TangleSimulator {
    pub fn new(config: Config, params: SimulationParams) -> Self {
        Self { config, params }
    }

    pub async fn run(self) -> Report {
        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let tangle = Arc::new(SimTangle::new());
        let counters = Arc::new(TipSelCounters::default());
        let selector_rng = StdRng::seed_from_u64(rng.next_u64());
        let selector = Arc::new(TipSelector::with_rng(&self.config, tangle.clone(), counters.clone(), selector_rng));
        let stats_task = tokio::spawn(collect_selection_stats(selector.subscribe(EVENTS_CAPACITY)));

        let tick_service = Arc::new(TickService::new());
        let (notifier, notifications) = unbounded();
        let mut services: Vec<Arc<dyn AsyncService>> = vec![Arc::new(TipSelectionService::new(
            selector.clone(),
            tangle.clone(),
            notifications,
            tick_service.clone(),
            DEFAULT_CLEANUP_INTERVAL,
        ))];
        if self.params.monitor {
            services.push(Arc::new(TipSelectionMonitor::new(counters.clone(), tick_service.clone())));
        }
        let handles = services.iter().map(|service| tokio::spawn(service.clone().start())).collect::<Vec<_>>();

        info!(
            "Issuing {} blocks at {} BPS, a milestone every {} blocks",
            self.params.blocks(),
            self.params.bps,
            self.params.milestone_interval
        );
        let issuer = BlockIssuer::new(
            tangle.clone(),
            selector.clone(),
            notifier.clone(),
            rng,
            self.params.spammer_share,
            self.params.milestone_interval,
        );
        let issuer_stats = issuer.run(self.params.blocks(), self.params.block_period()).await;

        // Let the service catch up with the issued blocks
        while !notifier.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        for service in services.iter() {
            service.clone().signal_exit();
        }
        for (service, handle) in services.iter().zip(handles) {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("{} failed: {}", service.clone().ident(), err),
                Err(err) => warn!("{} panicked: {}", service.clone().ident(), err),
            }
        }
        for service in services.drain(..) {
            if let Err(err) = service.clone().stop().await {
                warn!("{} failed stopping: {}", service.ident(), err);
            }
        }

        let report = Report {
            issuer: issuer_stats,
            selections: SelectionStats::default(),
            counters: counters.snapshot(),
            non_lazy_tips: selector.non_lazy_tips_count(),
            semi_lazy_tips: selector.semi_lazy_tips_count(),
            tangle_size: tangle.block_count(),
        };

        // Dropping the last selector reference closes the event subscription
        drop(selector);
        let selections = stats_task.await.unwrap_or_default();
        Report { selections, ..report }
    }
}

async fn collect_selection_stats(events: Receiver<TipSelectionEvent>) -> SelectionStats {
    let mut stats = SelectionStats::default();
    while let Ok(event) = events.recv().await {
        if let TipSelectionEvent::TipSelPerformed(performed) = event {
            stats.record(performed.duration);
        }
    }
    stats
}
