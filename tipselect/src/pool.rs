use crate::{config::PoolConfig, score::Score, tip::Tip};
use indexmap::IndexMap;
use rand::Rng;
use std::time::{Duration, Instant};
use tangle_hashes::BlockId;

/// Upper bound on the slots reserved up front, larger pools grow on demand
const MAX_PREALLOCATED_TIPS: usize = 1 << 12;

/// The tips of a single score tier.
///
/// Tips are kept in insertion-indexed storage so that a uniformly random member
/// can be drawn in constant time.
pub(crate) struct TipPool {
    score: Score,
    config: PoolConfig,
    tips: IndexMap<BlockId, Tip>,
}

impl TipPool {
    pub(crate) fn new(score: Score, config: PoolConfig) -> Self {
        assert_ne!(score, Score::Lazy, "lazy tips are never pooled");
        // Use `limit + 2` for not triggering a realloc when the pool transiently exceeds its retention limit
        let capacity = config.retention_rules_tips_limit.saturating_add(2).min(MAX_PREALLOCATED_TIPS);
        Self { score, config, tips: IndexMap::with_capacity(capacity) }
    }

    pub(crate) fn score(&self) -> Score {
        self.score
    }

    pub(crate) fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub(crate) fn len(&self) -> usize {
        self.tips.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    pub(crate) fn contains(&self, block_id: &BlockId) -> bool {
        self.tips.contains_key(block_id)
    }

    pub(crate) fn get(&self, block_id: &BlockId) -> Option<&Tip> {
        self.tips.get(block_id)
    }

    pub(crate) fn get_mut(&mut self, block_id: &BlockId) -> Option<&mut Tip> {
        self.tips.get_mut(block_id)
    }

    pub(crate) fn exceeds_retention_limit(&self) -> bool {
        self.tips.len() > self.config.retention_rules_tips_limit
    }

    /// Inserts a tip of this pool's tier. Returns false if the block is already a member.
    pub(crate) fn insert(&mut self, tip: Tip) -> bool {
        debug_assert_eq!(tip.score, self.score);
        if self.tips.contains_key(&tip.block_id) {
            return false;
        }
        self.tips.insert(tip.block_id, tip);
        true
    }

    pub(crate) fn remove(&mut self, block_id: &BlockId) -> Option<Tip> {
        self.tips.swap_remove(block_id)
    }

    /// Draws a member uniformly at random
    pub(crate) fn random_tip<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<BlockId> {
        if self.tips.is_empty() {
            return None;
        }
        self.tips.get_index(rng.gen_range(0..self.tips.len())).map(|(block_id, _)| *block_id)
    }

    pub(crate) fn block_ids(&self) -> Vec<BlockId> {
        self.tips.keys().copied().collect()
    }

    /// Tips whose first child referenced them at least `max_referenced_tip_age` before `now`
    pub(crate) fn expired_referenced_tips(&self, now: Instant) -> Vec<BlockId> {
        let max_age = self.config.max_referenced_tip_age;
        self.tips
            .values()
            .filter(|tip| tip.time_first_child.is_some_and(|time| Self::is_expired(time, now, max_age)))
            .map(|tip| tip.block_id)
            .collect()
    }

    fn is_expired(time_first_child: Instant, now: Instant, max_age: Duration) -> bool {
        now.saturating_duration_since(time_first_child) >= max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashMap;

    fn pool(limit: usize, max_age: Duration) -> TipPool {
        TipPool::new(Score::NonLazy, PoolConfig::new(limit, max_age, 2, 0))
    }

    #[test]
    fn test_insert_and_remove() {
        let mut pool = pool(10, Duration::ZERO);
        let id = BlockId::from_u64_word(1);
        assert!(pool.insert(Tip::new(id, Score::NonLazy)));
        assert!(!pool.insert(Tip::new(id, Score::NonLazy)));
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&id));
        assert_eq!(pool.remove(&id).map(|tip| tip.block_id), Some(id));
        assert!(pool.remove(&id).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_random_tip_covers_all_members() {
        const TIPS: u64 = 8;
        const DRAWS: usize = 8_000;

        let mut rng = StdRng::seed_from_u64(42);
        let mut pool = pool(100, Duration::ZERO);
        assert_eq!(pool.random_tip(&mut rng), None);

        (0..TIPS).for_each(|i| {
            pool.insert(Tip::new(BlockId::from_u64_word(i), Score::NonLazy));
        });
        let mut hits: HashMap<BlockId, usize> = HashMap::new();
        for _ in 0..DRAWS {
            *hits.entry(pool.random_tip(&mut rng).unwrap()).or_default() += 1;
        }
        assert_eq!(hits.len(), TIPS as usize);
        // Every member should get roughly DRAWS / TIPS = 1000 hits
        assert!(hits.values().all(|&count| (700..1300).contains(&count)), "{:?}", hits);
    }

    #[test]
    fn test_retention_limit_is_strict() {
        let mut pool = pool(2, Duration::ZERO);
        for i in 0..2 {
            pool.insert(Tip::new(BlockId::from_u64_word(i), Score::NonLazy));
        }
        assert!(!pool.exceeds_retention_limit());
        pool.insert(Tip::new(BlockId::from_u64_word(2), Score::NonLazy));
        assert!(pool.exceeds_retention_limit());
    }

    #[test]
    fn test_expired_referenced_tips() {
        let mut pool = pool(10, Duration::from_secs(10));
        let (fresh, old, unreferenced) = (BlockId::from_u64_word(1), BlockId::from_u64_word(2), BlockId::from_u64_word(3));
        for id in [fresh, old, unreferenced] {
            pool.insert(Tip::new(id, Score::NonLazy));
        }
        let referenced = Instant::now();
        pool.get_mut(&old).unwrap().time_first_child = Some(referenced);
        pool.get_mut(&fresh).unwrap().time_first_child = Some(referenced + Duration::from_secs(5));

        assert!(pool.expired_referenced_tips(referenced + Duration::from_secs(9)).is_empty());
        assert_eq!(pool.expired_referenced_tips(referenced + Duration::from_secs(11)), vec![old]);
        // An evaluation instant preceding the reference never counts as aged
        assert!(pool.expired_referenced_tips(referenced).is_empty());
    }

    #[test]
    fn test_unbounded_retention_limit() {
        for limit in [usize::MAX, usize::MAX / 64] {
            let mut pool = pool(limit, Duration::ZERO);
            assert!(pool.tips.capacity() < 2 * MAX_PREALLOCATED_TIPS);
            (0..10).for_each(|i| {
                pool.insert(Tip::new(BlockId::from_u64_word(i), Score::NonLazy));
            });
            assert_eq!(pool.len(), 10);
            assert!(!pool.exceeds_retention_limit());
        }
    }
}
