use super::tangle::SimTangle;
use async_channel::Sender;
use rand::{rngs::StdRng, Rng};
use std::{sync::Arc, time::Duration};
use tangle_core::{debug, trace, warn};
use tangle_hashes::{BlockId, EMPTY_BLOCK_ID};
use tangle_tipselect::{
    errors::TipSelectionResult,
    model::{SelectedTips, SolidBlock, BLOCK_PARENTS_COUNT},
    service::TangleNotification,
    TipSelector,
};
use tokio::time::{interval, MissedTickBehavior};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IssuerStats {
    pub blocks: u64,
    pub spam_blocks: u64,
    pub milestones: u64,
    /// Blocks which approved the latest milestone because no tips were available
    pub fallback_blocks: u64,
}

/// Issues blocks on top of the tips picked by the tip selector, and a milestone
/// every `milestone_interval` blocks
pub struct BlockIssuer {
    tangle: Arc<SimTangle>,
    selector: Arc<TipSelector>,
    notifier: Sender<TangleNotification>,
    rng: StdRng,
    spammer_share: f64,
    milestone_interval: u64,
    next_block: u64,
    latest_milestone: BlockId,
    stats: IssuerStats,
}

impl BlockIssuer {
    pub fn new(
        tangle: Arc<SimTangle>,
        selector: Arc<TipSelector>,
        notifier: Sender<TangleNotification>,
        rng: StdRng,
        spammer_share: f64,
        milestone_interval: u64,
    ) -> Self {
        assert!((0.0..=1.0).contains(&spammer_share));
        assert!(milestone_interval > 0);
        Self {
            tangle,
            selector,
            notifier,
            rng,
            spammer_share,
            milestone_interval,
            next_block: 1,
            latest_milestone: EMPTY_BLOCK_ID,
            stats: IssuerStats::default(),
        }
    }

    /// Issues `blocks` blocks spaced by `period`
    pub async fn run(mut self, blocks: u64, period: Duration) -> IssuerStats {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        for _ in 0..blocks {
            ticker.tick().await;
            if !self.issue_block().await {
                break;
            }
            if self.stats.blocks % self.milestone_interval == 0 && !self.issue_milestone().await {
                break;
            }
        }
        self.stats
    }

    async fn issue_block(&mut self) -> bool {
        let spam = self.rng.gen_bool(self.spammer_share);
        let selection = if spam { self.selector.select_spammer_tips().map(|spam| spam.tips) } else { self.selector.select_non_lazy_tips() };
        let parents = self.parents_or_fallback(selection);

        self.stats.blocks += 1;
        if spam {
            self.stats.spam_blocks += 1;
        }
        self.attach(parents).await.is_some()
    }

    async fn issue_milestone(&mut self) -> bool {
        let selection = self.selector.select_non_lazy_tips();
        let parents = self.parents_or_fallback(selection);
        let Some(milestone) = self.attach(parents).await else {
            return false;
        };

        let (index, referenced) = self.tangle.confirm_milestone(milestone);
        self.latest_milestone = milestone;
        self.stats.milestones += 1;
        debug!("Milestone {} {} referenced {} blocks", index, milestone, referenced);
        self.notify(TangleNotification::ConfirmedMilestoneIndexChanged(index)).await
    }

    fn parents_or_fallback(&mut self, selection: TipSelectionResult<SelectedTips>) -> [BlockId; BLOCK_PARENTS_COUNT] {
        match selection {
            Ok(tips) => tips.to_array(),
            Err(err) => {
                trace!("tip selection failed: {}, approving the latest milestone", err);
                self.stats.fallback_blocks += 1;
                [self.latest_milestone; BLOCK_PARENTS_COUNT]
            }
        }
    }

    async fn attach(&mut self, parents: [BlockId; BLOCK_PARENTS_COUNT]) -> Option<BlockId> {
        let block_id = BlockId::from_u64_word(self.next_block);
        self.next_block += 1;
        self.tangle.attach(block_id, parents);
        self.notify(TangleNotification::BlockSolid(SolidBlock::new(block_id, parents))).await.then_some(block_id)
    }

    async fn notify(&self, notification: TangleNotification) -> bool {
        if self.notifier.send(notification).await.is_err() {
            warn!("tangle notification channel closed, stopping the block issuer");
            return false;
        }
        true
    }
}
