use crate::model::MilestoneIndex;
use std::time::Duration;

pub(crate) const DEFAULT_MAX_DELTA_BLOCK_YOUNGEST_CONE_ROOT_INDEX_TO_CMI: MilestoneIndex = 8;
pub(crate) const DEFAULT_MAX_DELTA_BLOCK_OLDEST_CONE_ROOT_INDEX_TO_CMI: MilestoneIndex = 13;
pub(crate) const DEFAULT_BELOW_MAX_DEPTH: MilestoneIndex = 15;

pub(crate) const DEFAULT_NON_LAZY_RETENTION_RULES_TIPS_LIMIT: usize = 100;
pub(crate) const DEFAULT_NON_LAZY_MAX_REFERENCED_TIP_AGE: Duration = Duration::from_secs(3);
pub(crate) const DEFAULT_NON_LAZY_MAX_CHILDREN: u32 = 30;
pub(crate) const DEFAULT_NON_LAZY_SPAMMER_TIPS_THRESHOLD: usize = 0;

pub(crate) const DEFAULT_SEMI_LAZY_RETENTION_RULES_TIPS_LIMIT: usize = 20;
pub(crate) const DEFAULT_SEMI_LAZY_MAX_REFERENCED_TIP_AGE: Duration = Duration::from_secs(3);
pub(crate) const DEFAULT_SEMI_LAZY_MAX_CHILDREN: u32 = 2;
pub(crate) const DEFAULT_SEMI_LAZY_SPAMMER_TIPS_THRESHOLD: usize = 30;

/// Retention rules of a single tip pool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Pool size above which referenced tips are removed right away, bypassing
    /// `max_children` and `max_referenced_tip_age`
    pub retention_rules_tips_limit: usize,

    /// Time a tip remains in the pool after it was referenced by its first child.
    /// Zero disables age based eviction.
    pub max_referenced_tip_age: Duration,

    /// Number of children after which a tip is removed from the pool
    pub max_children: u32,

    /// Pool size the spammer uses to decide whether to relieve this pool.
    /// Zero disables the check (semi-lazy: never spam, non-lazy: always spam).
    pub spammer_tips_threshold: usize,
}

impl PoolConfig {
    pub fn new(
        retention_rules_tips_limit: usize,
        max_referenced_tip_age: Duration,
        max_children: u32,
        spammer_tips_threshold: usize,
    ) -> Self {
        Self { retention_rules_tips_limit, max_referenced_tip_age, max_children, spammer_tips_threshold }
    }

    pub fn default_non_lazy() -> Self {
        Self::new(
            DEFAULT_NON_LAZY_RETENTION_RULES_TIPS_LIMIT,
            DEFAULT_NON_LAZY_MAX_REFERENCED_TIP_AGE,
            DEFAULT_NON_LAZY_MAX_CHILDREN,
            DEFAULT_NON_LAZY_SPAMMER_TIPS_THRESHOLD,
        )
    }

    pub fn default_semi_lazy() -> Self {
        Self::new(
            DEFAULT_SEMI_LAZY_RETENTION_RULES_TIPS_LIMIT,
            DEFAULT_SEMI_LAZY_MAX_REFERENCED_TIP_AGE,
            DEFAULT_SEMI_LAZY_MAX_CHILDREN,
            DEFAULT_SEMI_LAZY_SPAMMER_TIPS_THRESHOLD,
        )
    }

    pub(crate) fn is_age_eviction_enabled(&self) -> bool {
        !self.max_referenced_tip_age.is_zero()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum allowed delta between the confirmed milestone index (CMI) and the
    /// youngest cone root index of a block before it is considered lazy
    pub max_delta_block_youngest_cone_root_index_to_cmi: MilestoneIndex,

    /// Maximum allowed delta between the CMI and the oldest cone root index of a block
    /// before it is considered semi-lazy
    pub max_delta_block_oldest_cone_root_index_to_cmi: MilestoneIndex,

    /// Maximum allowed delta between the CMI and the oldest cone root index of a block
    /// before it is considered lazy
    pub below_max_depth: MilestoneIndex,

    pub non_lazy: PoolConfig,
    pub semi_lazy: PoolConfig,
}

impl Config {
    pub fn new(
        max_delta_block_youngest_cone_root_index_to_cmi: MilestoneIndex,
        max_delta_block_oldest_cone_root_index_to_cmi: MilestoneIndex,
        below_max_depth: MilestoneIndex,
        non_lazy: PoolConfig,
        semi_lazy: PoolConfig,
    ) -> Self {
        Self {
            max_delta_block_youngest_cone_root_index_to_cmi,
            max_delta_block_oldest_cone_root_index_to_cmi,
            below_max_depth,
            non_lazy,
            semi_lazy,
        }
    }

    /// Build a default config
    pub fn build_default() -> Self {
        Self::new(
            DEFAULT_MAX_DELTA_BLOCK_YOUNGEST_CONE_ROOT_INDEX_TO_CMI,
            DEFAULT_MAX_DELTA_BLOCK_OLDEST_CONE_ROOT_INDEX_TO_CMI,
            DEFAULT_BELOW_MAX_DEPTH,
            PoolConfig::default_non_lazy(),
            PoolConfig::default_semi_lazy(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::build_default()
    }
}
