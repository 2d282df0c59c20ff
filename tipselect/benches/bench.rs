use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use tangle_hashes::{BlockId, EMPTY_BLOCK_ID};
use tangle_tipselect::{
    config::Config,
    context::TangleContext,
    errors::TangleContextResult,
    model::{ConeRootIndexes, MilestoneIndex, SolidBlock},
    TipSelCounters, TipSelector,
};

const CMI: MilestoneIndex = 1_000;

/// A tangle where every block is freshly referenced
struct FreshTangle;

impl TangleContext for FreshTangle {
    fn cone_root_indexes(&self, _block_id: &BlockId, _cmi: MilestoneIndex) -> TangleContextResult<ConeRootIndexes> {
        Ok(ConeRootIndexes::referenced_at(CMI))
    }

    fn confirmed_milestone_index(&self) -> MilestoneIndex {
        CMI
    }

    fn is_node_synced_within_below_max_depth(&self) -> bool {
        true
    }

    fn is_node_almost_synced(&self) -> bool {
        true
    }
}

fn build_selector(tips: u64) -> TipSelector {
    let selector = TipSelector::new(&Config::build_default(), Arc::new(FreshTangle), Arc::new(TipSelCounters::default()));
    for i in 1..=tips {
        selector.add_tip(&SolidBlock::new(BlockId::from_u64_word(i), [EMPTY_BLOCK_ID, EMPTY_BLOCK_ID]));
    }
    selector
}

pub fn bench_tip_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("tip selection");

    let selector = build_selector(100);
    group.bench_function("select non-lazy tips", |b| b.iter(|| black_box(selector.select_non_lazy_tips())));

    // Every issued block approves two selected tips, so the pool churns at its retention limit
    let selector = build_selector(100);
    let mut next = 1_000u64;
    group.bench_function("select and add tip", |b| {
        b.iter(|| {
            black_box({
                let tips = selector.select_non_lazy_tips().unwrap();
                next += 1;
                selector.add_tip(&SolidBlock::new(BlockId::from_u64_word(next), tips.to_array()));
                0
            })
        })
    });

    let selector = build_selector(100);
    group.bench_function("update scores", |b| b.iter(|| black_box(selector.update_scores())));

    group.finish();
}

criterion_group!(benches, bench_tip_selection);
criterion_main!(benches);
