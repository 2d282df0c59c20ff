use crate::{
    context::TangleContext,
    model::{MilestoneIndex, SolidBlock},
    TipSelector,
};
use async_channel::Receiver;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tangle_core::{
    debug,
    task::{
        service::{AsyncService, AsyncServiceFuture},
        tick::{TickReason, TickService},
    },
    trace,
};
use tokio::select;
use triggered::{trigger, Listener, Trigger};

const TIP_SELECTION_SERVICE: &str = "tip-selection-service";

pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Tangle events driving the tip pools
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TangleNotification {
    BlockSolid(SolidBlock),
    ConfirmedMilestoneIndexChanged(MilestoneIndex),
}

/// Keeps the tip pools of a [`TipSelector`] up to date.
///
/// Solid blocks are added as tips and tips are rescored whenever the confirmed
/// milestone index changes. Both are skipped while the node is syncing since
/// the pools are of no use then. Referenced tips are swept periodically.
pub struct TipSelectionService {
    selector: Arc<TipSelector>,
    context: Arc<dyn TangleContext>,
    notifications: Receiver<TangleNotification>,
    tick_service: Arc<TickService>,
    cleanup_interval: Duration,
    shutdown_trigger: Trigger,
    shutdown_listener: Listener,
}

impl TipSelectionService {
    pub fn new(
        selector: Arc<TipSelector>,
        context: Arc<dyn TangleContext>,
        notifications: Receiver<TangleNotification>,
        tick_service: Arc<TickService>,
        cleanup_interval: Duration,
    ) -> Self {
        let (shutdown_trigger, shutdown_listener) = trigger();
        Self { selector, context, notifications, tick_service, cleanup_interval, shutdown_trigger, shutdown_listener }
    }

    pub fn selector(&self) -> &Arc<TipSelector> {
        &self.selector
    }

    fn handle_notification(&self, notification: TangleNotification) {
        if !self.context.is_node_almost_synced() {
            return;
        }

        match notification {
            TangleNotification::BlockSolid(block) => self.selector.add_tip(&block),
            TangleNotification::ConfirmedMilestoneIndexChanged(index) => {
                let start = Instant::now();
                let removed = self.selector.update_scores();
                debug!("Tip scores updated for milestone {}, removed: {}, took: {:?}", index, removed, start.elapsed());
            }
        }
    }

    async fn notification_worker(&self) {
        loop {
            select! {
                biased;
                _ = self.shutdown_listener.clone() => break,
                notification = self.notifications.recv() => match notification {
                    Ok(notification) => self.handle_notification(notification),
                    Err(_) => {
                        debug!("[{}] notification channel closed", TIP_SELECTION_SERVICE);
                        break;
                    }
                },
            }
        }
    }

    async fn cleanup_worker(&self) {
        while let TickReason::Wakeup = self.tick_service.tick(self.cleanup_interval).await {
            let start = Instant::now();
            let removed = self.selector.clean_up_referenced_tips();
            debug!("Referenced tips cleaned up, removed: {}, took: {:?}", removed, start.elapsed());
        }
    }
}

impl AsyncService for TipSelectionService {
    fn ident(self: Arc<Self>) -> &'static str {
        TIP_SELECTION_SERVICE
    }

    fn start(self: Arc<Self>) -> AsyncServiceFuture {
        trace!("{} starting", TIP_SELECTION_SERVICE);
        Box::pin(async move {
            tokio::join!(self.notification_worker(), self.cleanup_worker());
            trace!("{} workers exited", TIP_SELECTION_SERVICE);
            Ok(())
        })
    }

    fn signal_exit(self: Arc<Self>) {
        trace!("sending an exit signal to {}", TIP_SELECTION_SERVICE);
        self.shutdown_trigger.trigger();
        self.tick_service.shutdown();
    }

    fn stop(self: Arc<Self>) -> AsyncServiceFuture {
        Box::pin(async move {
            trace!("{} stopped", TIP_SELECTION_SERVICE);
            Ok(())
        })
    }
}
