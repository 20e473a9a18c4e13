use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;
use webview_autoheight::host::{DeferredFrames, HeightReconciler, ReconcilerConfig};

fn recording(min_height: f64, frames: Option<Arc<DeferredFrames>>) -> (HeightReconciler, Arc<Mutex<Vec<u32>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let config = ReconcilerConfig {
        min_height,
        on_height_change: Some(Arc::new(move |h| sink.lock().push(h))),
    };
    let reconciler = match frames {
        Some(frames) => HeightReconciler::new(config, frames),
        None => HeightReconciler::synchronous(config),
    };
    (reconciler, seen)
}

proptest! {
    #[test]
    fn committed_height_never_drops_below_minimum(
        min in 0.0f64..2000.0,
        samples in prop::collection::vec(-100.0f64..5000.0, 1..40),
    ) {
        let (reconciler, seen) = recording(min, None);
        let floor = (min.ceil() as u32).max(1);
        for sample in samples {
            reconciler.ingest(sample);
            prop_assert!(reconciler.height() >= floor);
        }
        prop_assert!(seen.lock().iter().all(|h| *h >= floor));
    }

    #[test]
    fn changes_within_one_pixel_are_ignored(
        start in 10u32..5000,
        delta in -1i64..=1,
    ) {
        let (reconciler, seen) = recording(0.0, None);
        reconciler.ingest(start);
        seen.lock().clear();

        let nudged = (start as i64 + delta) as f64;
        reconciler.ingest(nudged);
        prop_assert_eq!(reconciler.height(), start);
        prop_assert!(seen.lock().is_empty());
    }

    #[test]
    fn a_burst_commits_once_with_the_latest_value(
        samples in prop::collection::vec(50u32..5000, 1..20),
        last in 6000u32..9000,
    ) {
        let frames = DeferredFrames::new();
        let (reconciler, seen) = recording(0.0, Some(frames.clone()));
        for sample in samples {
            reconciler.ingest(sample);
        }
        reconciler.ingest(last);
        frames.run_pending();

        prop_assert_eq!(reconciler.height(), last);
        prop_assert_eq!(seen.lock().clone(), vec![last]);
    }

    #[test]
    fn raising_the_minimum_commits_it_once(
        content in 50u32..1000,
        min in 1001.0f64..4000.0,
    ) {
        let (reconciler, seen) = recording(0.0, None);
        reconciler.ingest(content);
        seen.lock().clear();

        reconciler.set_min_height(min);
        let expected = min.ceil() as u32;
        prop_assert_eq!(reconciler.height(), expected);
        prop_assert_eq!(seen.lock().clone(), vec![expected]);
    }
}
