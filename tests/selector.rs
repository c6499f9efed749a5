//! Decision-table tests for the outcome selector.
//!
//! Fake stages write canned byte counts (or return canned errors) so every
//! branch of the selection logic is exercised without spawning a single
//! external process. Scenario numbering follows the selection contract:
//! big win, already-minimal input, malformed input, tools missing, and
//! stage-B-failure degradation.

use pdfsqueeze::error::{SqueezeError, StageError};
use pdfsqueeze::outcome::CandidateSource;
use pdfsqueeze::pipeline::workspace::Workspace;
use pdfsqueeze::pipeline::TransformStage;
use pdfsqueeze::selector::{select, StageSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

// ── Fake stage machinery ─────────────────────────────────────────────────

type StageFn = Box<dyn Fn(&Path, &Path) -> Result<(), StageError> + Send + Sync>;

struct FakeStage {
    id: &'static str,
    behaviour: StageFn,
    calls: AtomicUsize,
}

impl FakeStage {
    /// A stage that writes `size` bytes to the output path.
    fn produce(id: &'static str, size: usize) -> Self {
        Self {
            id,
            behaviour: Box::new(move |_, output| {
                std::fs::write(output, vec![b'x'; size]).unwrap();
                Ok(())
            }),
            calls: AtomicUsize::new(0),
        }
    }

    fn fail_with(id: &'static str, make: fn(&'static str) -> StageError) -> Self {
        Self {
            id,
            behaviour: Box::new(move |_, _| Err(make(id))),
            calls: AtomicUsize::new(0),
        }
    }

    fn tool_missing(id: &'static str) -> Self {
        Self::fail_with(id, |id| StageError::ToolMissing { tool: id.into() })
    }

    fn malformed(id: &'static str) -> Self {
        Self::fail_with(id, |id| StageError::MalformedInput {
            tool: id.into(),
            detail: "couldn't find trailer".into(),
        })
    }

    fn crashed(id: &'static str) -> Self {
        Self::fail_with(id, |id| StageError::Failed {
            tool: id.into(),
            status: Some(139),
            stderr: "boom".into(),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransformStage for FakeStage {
    fn id(&self) -> &'static str {
        self.id
    }

    fn apply(&self, input: &Path, output: &Path) -> Result<(), StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.behaviour)(input, output)
    }
}

/// A 10 kB well-formed-enough document for the workspace's magic check.
fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(len, b'p');
    bytes
}

fn stage_set<'a>(
    primary: &'a FakeStage,
    alternate: &'a FakeStage,
    optimizer: &'a FakeStage,
    fallback: &'a FakeStage,
) -> StageSet<'a> {
    StageSet {
        primary,
        alternate,
        optimizer,
        fallback,
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[test]
fn big_win_skips_the_fallback() {
    let ws = Workspace::for_document(&pdf_bytes(10_000)).unwrap();
    let primary = FakeStage::produce("gs-primary", 6_000);
    let alternate = FakeStage::produce("gs-alternate", 6_000);
    let optimizer = FakeStage::produce("qpdf", 5_000);
    let fallback = FakeStage::produce("gs-simple", 4_000);

    let sel = select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 5).unwrap();

    assert_eq!(sel.source, CandidateSource::Primary);
    assert_eq!(sel.final_size, 5_000);
    assert_eq!(sel.pipeline1_size, Some(5_000));
    assert_eq!(sel.pipeline2_size, None);
    // Threshold met, so the cheaper fallback must never have run,
    // even though it would have produced a smaller file.
    assert_eq!(fallback.call_count(), 0);
    assert_eq!(alternate.call_count(), 0);
}

#[test]
fn already_minimal_input_returns_original() {
    let ws = Workspace::for_document(&pdf_bytes(500)).unwrap();
    let primary = FakeStage::produce("gs-primary", 600);
    let alternate = FakeStage::produce("gs-alternate", 600);
    let optimizer = FakeStage::produce("qpdf", 620);
    let fallback = FakeStage::produce("gs-simple", 510);

    let sel = select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 5).unwrap();

    assert_eq!(sel.source, CandidateSource::Original);
    assert_eq!(sel.final_size, 500);
    assert!(sel.path.is_none(), "original must come back as-is, not from disk");
    // Both pipelines ran and lost.
    assert_eq!(sel.pipeline1_size, Some(620));
    assert_eq!(sel.pipeline2_size, Some(510));
}

#[test]
fn malformed_input_classifies_as_invalid_document() {
    let ws = Workspace::for_document(&pdf_bytes(1_000)).unwrap();
    let primary = FakeStage::malformed("gs-primary");
    let alternate = FakeStage::malformed("gs-alternate");
    let optimizer = FakeStage::produce("qpdf", 100);
    let fallback = FakeStage::malformed("gs-simple");

    let err = select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 5).unwrap_err();

    assert!(matches!(err, SqueezeError::InvalidDocument { .. }), "got {err:?}");
    // Stage B never ran: there was nothing for it to optimise.
    assert_eq!(optimizer.call_count(), 0);
}

#[test]
fn missing_tools_classify_as_unavailable() {
    let ws = Workspace::for_document(&pdf_bytes(1_000)).unwrap();
    let primary = FakeStage::tool_missing("gs-primary");
    let alternate = FakeStage::tool_missing("gs-alternate");
    let optimizer = FakeStage::tool_missing("qpdf");
    let fallback = FakeStage::tool_missing("gs-simple");

    let err = select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 5).unwrap_err();

    assert!(
        matches!(err, SqueezeError::CompressionUnavailable { .. }),
        "got {err:?}"
    );
}

#[test]
fn stage_b_failure_degrades_to_stage_a_output() {
    let ws = Workspace::for_document(&pdf_bytes(10_000)).unwrap();
    let primary = FakeStage::produce("gs-primary", 7_000);
    let alternate = FakeStage::produce("gs-alternate", 7_000);
    let optimizer = FakeStage::crashed("qpdf");
    let fallback = FakeStage::produce("gs-simple", 9_000);

    let sel = select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 5).unwrap();

    // 30% gain from stage A alone meets the threshold; qpdf's crash costs
    // only its own contribution.
    assert_eq!(sel.source, CandidateSource::Primary);
    assert_eq!(sel.final_size, 7_000);
    assert_eq!(fallback.call_count(), 0);
}

// ── Decision-table edges ─────────────────────────────────────────────────

#[test]
fn below_threshold_triggers_fallback_and_smaller_wins() {
    let ws = Workspace::for_document(&pdf_bytes(10_000)).unwrap();
    // 2% gain: eligible, but below the 5% bar.
    let primary = FakeStage::produce("gs-primary", 9_900);
    let alternate = FakeStage::produce("gs-alternate", 9_900);
    let optimizer = FakeStage::produce("qpdf", 9_800);
    let fallback = FakeStage::produce("gs-simple", 7_000);

    let sel = select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 5).unwrap();

    assert_eq!(sel.source, CandidateSource::Fallback);
    assert_eq!(sel.final_size, 7_000);
    assert_eq!(fallback.call_count(), 1);
}

#[test]
fn fallback_failure_keeps_the_small_pipeline1_candidate() {
    let ws = Workspace::for_document(&pdf_bytes(10_000)).unwrap();
    // Smaller than original but under the threshold, so the fallback runs.
    let primary = FakeStage::produce("gs-primary", 9_900);
    let alternate = FakeStage::produce("gs-alternate", 9_900);
    let optimizer = FakeStage::produce("qpdf", 9_700);
    let fallback = FakeStage::crashed("gs-simple");

    let sel = select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 5).unwrap();

    assert_eq!(sel.source, CandidateSource::Primary);
    assert_eq!(sel.final_size, 9_700);
}

#[test]
fn exact_size_tie_prefers_pipeline_one() {
    let ws = Workspace::for_document(&pdf_bytes(10_000)).unwrap();
    let primary = FakeStage::produce("gs-primary", 7_000);
    let alternate = FakeStage::produce("gs-alternate", 7_000);
    let optimizer = FakeStage::produce("qpdf", 7_000);
    let fallback = FakeStage::produce("gs-simple", 7_000);

    // Threshold of 50% forces the fallback to run despite the 30% gain.
    let sel = select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 50).unwrap();

    assert_eq!(sel.final_size, 7_000);
    assert_eq!(sel.source, CandidateSource::Primary);
}

#[test]
fn primary_failure_recovers_via_alternate_parameters() {
    let ws = Workspace::for_document(&pdf_bytes(10_000)).unwrap();
    let primary = FakeStage::crashed("gs-primary");
    let alternate = FakeStage::produce("gs-alternate", 5_000);
    let optimizer = FakeStage::produce("qpdf", 4_500);
    let fallback = FakeStage::produce("gs-simple", 9_000);

    let sel = select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 5).unwrap();

    assert_eq!(sel.source, CandidateSource::Primary);
    assert_eq!(sel.final_size, 4_500);
    assert_eq!(primary.call_count(), 1);
    assert_eq!(alternate.call_count(), 1);
    assert_eq!(fallback.call_count(), 0);
}

#[test]
fn both_stage_a_attempts_down_but_fallback_saves_the_run() {
    let ws = Workspace::for_document(&pdf_bytes(10_000)).unwrap();
    let primary = FakeStage::crashed("gs-primary");
    let alternate = FakeStage::crashed("gs-alternate");
    let optimizer = FakeStage::produce("qpdf", 4_500);
    let fallback = FakeStage::produce("gs-simple", 6_000);

    let sel = select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 5).unwrap();

    assert_eq!(sel.source, CandidateSource::Fallback);
    assert_eq!(sel.final_size, 6_000);
    // No stage-A output existed for qpdf to touch.
    assert_eq!(optimizer.call_count(), 0);
}

#[test]
fn candidate_equal_to_original_is_eligible_but_zero_gain() {
    let ws = Workspace::for_document(&pdf_bytes(1_000)).unwrap();
    let primary = FakeStage::produce("gs-primary", 1_000);
    let alternate = FakeStage::produce("gs-alternate", 1_000);
    let optimizer = FakeStage::produce("qpdf", 1_000);
    let fallback = FakeStage::produce("gs-simple", 1_200);

    let sel = select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 5).unwrap();

    // "Not larger than the original" admits the tie; size is unchanged.
    assert_eq!(sel.final_size, 1_000);
    assert_eq!(sel.source, CandidateSource::Primary);
}

#[test]
fn size_safety_holds_across_profiles_of_fakes() {
    // Sweep a grid of fake sizes; the winner must never exceed the input.
    let original = 5_000;
    for p1 in [2_000, 4_999, 5_000, 5_001, 9_000] {
        for p2 in [2_500, 5_000, 8_000] {
            let ws = Workspace::for_document(&pdf_bytes(original)).unwrap();
            let primary = FakeStage::produce("gs-primary", p1);
            let alternate = FakeStage::produce("gs-alternate", p1);
            let optimizer = FakeStage::produce("qpdf", p1);
            let fallback = FakeStage::produce("gs-simple", p2);

            let sel =
                select(&ws, &stage_set(&primary, &alternate, &optimizer, &fallback), 5).unwrap();
            assert!(
                sel.final_size <= original as u64,
                "grew: p1={p1} p2={p2} final={}",
                sel.final_size
            );
        }
    }
}
