#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::types::RoomCode;
use draft_core::reconciler::Reconciler;
use draft_core::roster::RosterEntry;
use draft_core::{DraftEngine, RoomState};
use rand::rngs::StdRng;
use rand::SeedableRng;

criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .sample_size(20)
        .measurement_time(std::time::Duration::from_secs(2));
    targets =
        auto_resolving_full_draft,
        reconciling_full_draft,
}

fn roster() -> Vec<RosterEntry> {
    (1..=120)
        .map(|id| RosterEntry::new(id, format!("hero-{id}")))
        .collect()
}

fn play_full_draft(engine: &DraftEngine, roster: &[RosterEntry], seed: u64) -> Vec<RoomState> {
    let code = RoomCode::parse("bench").expect("valid code");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = RoomState::new();
    let mut snapshots = Vec::new();
    while !state.is_complete(engine.table()) {
        state = engine
            .apply_auto_resolution(&code, &state, roster, &mut rng)
            .expect("turn pending");
        snapshots.push(state.clone());
    }
    snapshots
}

fn auto_resolving_full_draft(c: &mut criterion::Criterion) {
    let engine = DraftEngine::default();
    let roster = roster();
    c.bench_function("auto-resolve a standard draft", |b| {
        b.iter(|| play_full_draft(&engine, &roster, 42))
    });
}

fn reconciling_full_draft(c: &mut criterion::Criterion) {
    let engine = DraftEngine::default();
    let snapshots = play_full_draft(&engine, &roster(), 42);
    c.bench_function("reconcile every snapshot of a standard draft", |b| {
        b.iter(|| {
            let mut reconciler = Reconciler::new();
            reconciler.prime(&RoomState::new());
            snapshots
                .iter()
                .map(|snapshot| reconciler.reconcile(snapshot).cues.len())
                .sum::<usize>()
        })
    });
}
