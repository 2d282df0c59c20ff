use crate::{
    config::Config,
    context::TangleContext,
    errors::{TipSelectionError, TipSelectionResult},
    events::{EventBroadcaster, TipSelStats, TipSelectionEvent},
    model::{MilestoneIndex, SelectedTips, SolidBlock, SpammerTips},
    pool::TipPool,
    score::{Score, ScoreCalculator},
    tip::Tip,
    TipSelCounters,
};
use async_channel::Receiver;
use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};
use tangle_core::{time::Stopwatch, trace};
use tangle_hashes::BlockId;

/// Number of draws attempted for a second tip differing from the first one
const MAX_SECOND_TIP_DRAWS: usize = 10;

struct Inner {
    non_lazy: TipPool,
    semi_lazy: TipPool,
    rng: StdRng,
}

impl Inner {
    fn pool(&self, score: Score) -> Option<&TipPool> {
        match score {
            Score::NonLazy => Some(&self.non_lazy),
            Score::SemiLazy => Some(&self.semi_lazy),
            Score::Lazy => None,
        }
    }

    fn pool_mut(&mut self, score: Score) -> Option<&mut TipPool> {
        match score {
            Score::NonLazy => Some(&mut self.non_lazy),
            Score::SemiLazy => Some(&mut self.semi_lazy),
            Score::Lazy => None,
        }
    }

    fn contains(&self, block_id: &BlockId) -> bool {
        self.non_lazy.contains(block_id) || self.semi_lazy.contains(block_id)
    }

    #[inline]
    fn debug_assert_exclusive(&self, block_id: &BlockId) {
        debug_assert!(
            !(self.non_lazy.contains(block_id) && self.semi_lazy.contains(block_id)),
            "tip {} is a member of both pools",
            block_id
        );
    }
}

/// TipSelector manages the non-lazy and semi-lazy tip pools and selects the
/// parents of new blocks from them.
///
/// Both pools are guarded by a single lock held for the whole duration of every
/// operation. No operation performs I/O while holding it, the only external
/// calls are the [`TangleContext`] lookups and the non-blocking event emission.
///
/// Membership rules:
///
/// - A block is a member of at most one pool.
/// - Lazy blocks are never members.
/// - A new tip only updates the bookkeeping of its parents in its own pool, so
///   the churn of one tier never evicts tips of the other.
pub struct TipSelector {
    calculator: ScoreCalculator,
    context: Arc<dyn TangleContext>,
    inner: Mutex<Inner>,
    events: EventBroadcaster,
    counters: Arc<TipSelCounters>,
}

impl TipSelector {
    pub fn new(config: &Config, context: Arc<dyn TangleContext>, counters: Arc<TipSelCounters>) -> Self {
        Self::with_rng(config, context, counters, StdRng::from_entropy())
    }

    /// Builds a tip selector drawing from the given random generator
    pub fn with_rng(config: &Config, context: Arc<dyn TangleContext>, counters: Arc<TipSelCounters>, rng: StdRng) -> Self {
        let inner = Inner {
            non_lazy: TipPool::new(Score::NonLazy, config.non_lazy),
            semi_lazy: TipPool::new(Score::SemiLazy, config.semi_lazy),
            rng,
        };
        Self {
            calculator: ScoreCalculator::from_config(config),
            context,
            inner: Mutex::new(inner),
            events: EventBroadcaster::new(counters.clone()),
            counters,
        }
    }

    /// Subscribes to the tip selector events. Events which do not fit into the
    /// `capacity` bounded queue are dropped for this subscriber.
    pub fn subscribe(&self, capacity: usize) -> Receiver<TipSelectionEvent> {
        self.events.subscribe(capacity)
    }

    pub fn counters(&self) -> &Arc<TipSelCounters> {
        &self.counters
    }

    pub fn non_lazy_tips_count(&self) -> usize {
        self.inner.lock().non_lazy.len()
    }

    pub fn semi_lazy_tips_count(&self) -> usize {
        self.inner.lock().semi_lazy.len()
    }

    /// Returns a copy of the tip if the block is a member of one of the pools
    pub fn get_tip(&self, block_id: &BlockId) -> Option<Tip> {
        let inner = self.inner.lock();
        inner.non_lazy.get(block_id).or_else(|| inner.semi_lazy.get(block_id)).cloned()
    }

    /// Returns the ids of the members of the pool holding tips of the given score
    pub fn tips(&self, score: Score) -> Vec<BlockId> {
        self.inner.lock().pool(score).map(|pool| pool.block_ids()).unwrap_or_default()
    }

    /// Adds a block which just became solid as a tip.
    ///
    /// The block enters the pool matching its score and its parents found in that
    /// same pool are updated: removed right away if the pool exceeds its retention
    /// limit or once they reach the maximum children count, otherwise their age
    /// clock is started. Lazy blocks are dropped without touching their parents,
    /// otherwise lazy traffic would empty the pools.
    pub fn add_tip(&self, block: &SolidBlock) {
        let mut inner = self.inner.lock();

        if inner.contains(&block.id) {
            return;
        }

        let cmi = self.context.confirmed_milestone_index();
        let score = self.calculator.calculate(self.context.as_ref(), &block.id, cmi);
        let Some(pool) = inner.pool_mut(score) else {
            return;
        };

        self.insert_tip(pool, Tip::new(block.id, score));

        let now = Instant::now();
        for parent in block.unique_parents() {
            self.on_tip_referenced(pool, &parent, now);
        }

        inner.debug_assert_exclusive(&block.id);
    }

    fn on_tip_referenced(&self, pool: &mut TipPool, block_id: &BlockId, now: Instant) {
        if !pool.contains(block_id) {
            return;
        }

        if pool.exceeds_retention_limit() {
            // too many tips, remove referenced ones right away to shrink the pool
            trace!("removing referenced {} tip {}, pool exceeds its retention limit", pool.score(), block_id);
            self.remove_tip(pool, block_id);
            return;
        }

        let config = *pool.config();
        let Some(tip) = pool.get_mut(block_id) else {
            return;
        };

        tip.children_count = tip.children_count.saturating_add(1);
        if tip.children_count >= config.max_children {
            trace!("removing {} tip {}, reached {} children", tip.score, block_id, tip.children_count);
            self.remove_tip(pool, block_id);
            return;
        }

        if config.is_age_eviction_enabled() && tip.time_first_child.is_none() {
            tip.time_first_child = Some(now);
        }
    }

    /// Selects two tips from the non-lazy pool
    pub fn select_non_lazy_tips(&self) -> TipSelectionResult<SelectedTips> {
        self.select_tips(Score::NonLazy)
    }

    /// Selects two tips from the semi-lazy pool
    pub fn select_semi_lazy_tips(&self) -> TipSelectionResult<SelectedTips> {
        self.select_tips(Score::SemiLazy)
    }

    /// Selects tips for spam blocks, preferring the pool which needs relief the most.
    ///
    /// The semi-lazy pool is spammed once it holds more tips than its threshold, but
    /// only with two distinct tips since a single one would not shrink it. Otherwise
    /// the non-lazy pool is spammed, unless it holds fewer tips than its threshold.
    pub fn select_spammer_tips(&self) -> TipSelectionResult<SpammerTips> {
        self.ensure_synced()?;
        let mut inner = self.inner.lock();

        let semi_lazy_threshold = inner.semi_lazy.config().spammer_tips_threshold;
        if semi_lazy_threshold != 0 && inner.semi_lazy.len() > semi_lazy_threshold {
            let tips = self.select_tips_locked(&mut inner, Score::SemiLazy)?;
            if !tips.is_distinct() {
                return Err(TipSelectionError::NoTipsAvailable);
            }
            return Ok(SpammerTips { semi_lazy: true, tips });
        }

        let non_lazy_threshold = inner.non_lazy.config().spammer_tips_threshold;
        if non_lazy_threshold != 0 && inner.non_lazy.len() < non_lazy_threshold {
            return Err(TipSelectionError::NoTipsAvailable);
        }

        let tips = self.select_tips_locked(&mut inner, Score::NonLazy)?;
        Ok(SpammerTips { semi_lazy: false, tips })
    }

    fn select_tips(&self, score: Score) -> TipSelectionResult<SelectedTips> {
        self.ensure_synced()?;
        let mut inner = self.inner.lock();
        self.select_tips_locked(&mut inner, score)
    }

    fn select_tips_locked(&self, inner: &mut Inner, score: Score) -> TipSelectionResult<SelectedTips> {
        let start = Instant::now();
        let result = Self::draw_tips(inner, score);
        self.counters.selections.fetch_add(1, Ordering::Relaxed);
        self.events.emit(TipSelectionEvent::TipSelPerformed(TipSelStats { duration: start.elapsed() }));
        result
    }

    fn draw_tips(inner: &mut Inner, score: Score) -> TipSelectionResult<SelectedTips> {
        let Inner { non_lazy, semi_lazy, rng } = inner;
        let pool = match score {
            Score::NonLazy => non_lazy,
            Score::SemiLazy => semi_lazy,
            Score::Lazy => return Err(TipSelectionError::NoTipsAvailable),
        };

        let first = pool.random_tip(rng).ok_or(TipSelectionError::NoTipsAvailable)?;
        for _ in 0..MAX_SECOND_TIP_DRAWS {
            match pool.random_tip(rng) {
                Some(second) if second != first => return Ok(SelectedTips(first, second)),
                Some(_) => continue,
                None => break,
            }
        }

        // no distinct second tip found, approve the first one twice
        Ok(SelectedTips(first, first))
    }

    fn ensure_synced(&self) -> TipSelectionResult<()> {
        if !self.context.is_node_synced_within_below_max_depth() {
            return Err(TipSelectionError::NotSynced);
        }
        Ok(())
    }

    /// Removes tips whose first child referenced them more than the pool's maximum
    /// referenced tip age ago. Returns the number of removed tips.
    pub fn clean_up_referenced_tips(&self) -> usize {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let now = Instant::now();
        let mut removed = 0;
        for pool in [&mut inner.non_lazy, &mut inner.semi_lazy] {
            for block_id in pool.expired_referenced_tips(now) {
                if self.remove_tip(pool, &block_id) {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Rescores all tips against the current confirmed milestone index.
    ///
    /// Tips which became lazy are removed, tips whose tier changed move to the
    /// other pool as fresh tips, and tips keeping their tier are left untouched.
    /// Returns the number of tips removed because they became lazy; moves between
    /// the pools are not counted.
    pub fn update_scores(&self) -> usize {
        let _sw = Stopwatch::<200>::with_threshold("update_scores op");
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let cmi = self.context.confirmed_milestone_index();

        let non_lazy_ids = inner.non_lazy.block_ids();
        let semi_lazy_ids = inner.semi_lazy.block_ids();

        let mut removed = 0;
        for block_id in non_lazy_ids {
            if self.rescore_tip(&mut inner.non_lazy, &mut inner.semi_lazy, block_id, cmi) {
                removed += 1;
            }
        }
        for block_id in semi_lazy_ids {
            if self.rescore_tip(&mut inner.semi_lazy, &mut inner.non_lazy, block_id, cmi) {
                removed += 1;
            }
        }
        removed
    }

    /// Rescores a member of `from`. Returns true if the tip became lazy and was removed.
    fn rescore_tip(&self, from: &mut TipPool, to: &mut TipPool, block_id: BlockId, cmi: MilestoneIndex) -> bool {
        let score = self.calculator.calculate(self.context.as_ref(), &block_id, cmi);
        if score == from.score() {
            return false;
        }

        self.remove_tip(from, &block_id);
        if score == Score::Lazy {
            trace!("removed {} tip {}, it became lazy", from.score(), block_id);
            return true;
        }

        debug_assert_eq!(score, to.score());
        trace!("moving tip {} from the {} pool to the {} pool", block_id, from.score(), to.score());
        self.insert_tip(to, Tip::new(block_id, score));
        false
    }

    fn insert_tip(&self, pool: &mut TipPool, tip: Tip) {
        let event = TipSelectionEvent::TipAdded(tip.clone());
        if pool.insert(tip) {
            if let Some(gauge) = self.gauge(pool.score()) {
                gauge.fetch_add(1, Ordering::Relaxed);
            }
            self.counters.tips_added.fetch_add(1, Ordering::Relaxed);
            self.events.emit(event);
        }
    }

    fn remove_tip(&self, pool: &mut TipPool, block_id: &BlockId) -> bool {
        match pool.remove(block_id) {
            Some(tip) => {
                if let Some(gauge) = self.gauge(pool.score()) {
                    gauge.fetch_sub(1, Ordering::Relaxed);
                }
                self.counters.tips_removed.fetch_add(1, Ordering::Relaxed);
                self.events.emit(TipSelectionEvent::TipRemoved(tip));
                true
            }
            None => false,
        }
    }

    fn gauge(&self, score: Score) -> Option<&AtomicU64> {
        match score {
            Score::NonLazy => Some(&self.counters.non_lazy_tips),
            Score::SemiLazy => Some(&self.counters.semi_lazy_tips),
            Score::Lazy => None,
        }
    }
}
