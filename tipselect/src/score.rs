use crate::{
    config::Config,
    context::TangleContext,
    model::{ConeRootIndexes, MilestoneIndex},
};
use std::fmt::{Display, Formatter};
use tangle_core::trace;
use tangle_hashes::BlockId;

/// Liveness tier of a tip in relation to the confirmed milestone index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Score {
    /// The tip should not be approved anymore
    Lazy,
    /// The tip lags behind and is only approved to pull it forward
    SemiLazy,
    NonLazy,
}

impl Display for Score {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Score::Lazy => write!(f, "lazy"),
            Score::SemiLazy => write!(f, "semi-lazy"),
            Score::NonLazy => write!(f, "non-lazy"),
        }
    }
}

/// Classifies blocks into [`Score`] tiers from their cone root indexes
#[derive(Clone, Copy, Debug)]
pub struct ScoreCalculator {
    max_delta_youngest_cone_root_index: MilestoneIndex,
    max_delta_oldest_cone_root_index: MilestoneIndex,
    below_max_depth: MilestoneIndex,
}

impl ScoreCalculator {
    pub fn new(
        max_delta_youngest_cone_root_index: MilestoneIndex,
        max_delta_oldest_cone_root_index: MilestoneIndex,
        below_max_depth: MilestoneIndex,
    ) -> Self {
        Self { max_delta_youngest_cone_root_index, max_delta_oldest_cone_root_index, below_max_depth }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_delta_block_youngest_cone_root_index_to_cmi,
            config.max_delta_block_oldest_cone_root_index_to_cmi,
            config.below_max_depth,
        )
    }

    /// Scores a block given its cone root indexes. The below max depth rule is checked
    /// before the semi-lazy one so that a block far behind the CMI is never semi-lazy.
    pub fn score(&self, indexes: ConeRootIndexes, cmi: MilestoneIndex) -> Score {
        // Indexes ahead of the CMI count as a zero delta
        if cmi.saturating_sub(indexes.youngest) > self.max_delta_youngest_cone_root_index {
            return Score::Lazy;
        }

        let oldest_delta = cmi.saturating_sub(indexes.oldest);
        if oldest_delta > self.below_max_depth {
            return Score::Lazy;
        }

        if oldest_delta > self.max_delta_oldest_cone_root_index {
            return Score::SemiLazy;
        }

        Score::NonLazy
    }

    /// Scores a block by looking up its cone root indexes. Blocks whose metadata cannot
    /// be resolved are lazy.
    pub fn calculate(&self, context: &dyn TangleContext, block_id: &BlockId, cmi: MilestoneIndex) -> Score {
        match context.cone_root_indexes(block_id, cmi) {
            Ok(indexes) => self.score(indexes, cmi),
            Err(err) => {
                trace!("scoring block {} as lazy: {}", block_id, err);
                Score::Lazy
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::tangle_mock::TangleMock;

    fn calculator() -> ScoreCalculator {
        ScoreCalculator::new(8, 13, 15)
    }

    #[test]
    fn test_score_rules() {
        struct Test {
            name: &'static str,
            cmi: MilestoneIndex,
            indexes: ConeRootIndexes,
            expected: Score,
        }
        let tests = vec![
            Test { name: "fresh block", cmi: 100, indexes: ConeRootIndexes::new(100, 100), expected: Score::NonLazy },
            Test { name: "youngest at the limit", cmi: 100, indexes: ConeRootIndexes::new(92, 92), expected: Score::NonLazy },
            Test { name: "youngest over the limit", cmi: 100, indexes: ConeRootIndexes::new(91, 91), expected: Score::Lazy },
            Test { name: "oldest at the semi-lazy limit", cmi: 100, indexes: ConeRootIndexes::new(100, 87), expected: Score::NonLazy },
            Test { name: "oldest over the semi-lazy limit", cmi: 100, indexes: ConeRootIndexes::new(100, 86), expected: Score::SemiLazy },
            Test { name: "oldest at below max depth", cmi: 100, indexes: ConeRootIndexes::new(100, 85), expected: Score::SemiLazy },
            Test { name: "oldest below max depth", cmi: 100, indexes: ConeRootIndexes::new(100, 84), expected: Score::Lazy },
            Test { name: "indexes ahead of the cmi", cmi: 10, indexes: ConeRootIndexes::new(12, 11), expected: Score::NonLazy },
            Test { name: "early tangle", cmi: 3, indexes: ConeRootIndexes::new(0, 0), expected: Score::NonLazy },
        ];
        let calculator = calculator();
        for test in tests {
            assert_eq!(calculator.score(test.indexes, test.cmi), test.expected, "{}", test.name);
        }
    }

    #[test]
    fn test_below_max_depth_takes_precedence() {
        // Both the semi-lazy and the below max depth thresholds are exceeded
        let calculator = ScoreCalculator::new(8, 2, 4);
        assert_eq!(calculator.score(ConeRootIndexes::new(50, 45), 50), Score::Lazy);
        assert_eq!(calculator.score(ConeRootIndexes::new(50, 46), 50), Score::SemiLazy);
    }

    #[test]
    fn test_unresolvable_block_is_lazy() {
        let tangle = TangleMock::new(100);
        let calculator = calculator();
        let known = BlockId::from_u64_word(1);
        let pruned = BlockId::from_u64_word(2);
        tangle.set_cone_root_indexes(known, ConeRootIndexes::referenced_at(100));
        tangle.set_cone_root_indexes(pruned, ConeRootIndexes::referenced_at(100));
        tangle.prune(pruned);

        assert_eq!(calculator.calculate(&tangle, &known, 100), Score::NonLazy);
        assert_eq!(calculator.calculate(&tangle, &pruned, 100), Score::Lazy);
        assert_eq!(calculator.calculate(&tangle, &BlockId::from_u64_word(3), 100), Score::Lazy);
    }
}
