mod common;

use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};

use common::{count, resolver, stream_item, CallLog, RecordingPlayer};
use reelfeed_lib::{
    feed::VisibilityScheduler,
    metrics::{EngagementAggregator, SurveyTrigger},
    models::ViewabilityRecord,
    playback::PlaybackHandle,
    ManualClock,
};

struct Fixture {
    scheduler: VisibilityScheduler,
    aggregator: EngagementAggregator,
    clock: ManualClock,
    log: CallLog,
    handles: Vec<Arc<PlaybackHandle>>,
}

async fn fixture(items: usize) -> Fixture {
    let clock = ManualClock::new();
    let aggregator = EngagementAggregator::default();
    let mut scheduler = VisibilityScheduler::new(0.5, Arc::new(clock.clone()), aggregator.clone());
    let log = CallLog::default();

    let mut handles = Vec::new();
    for i in 0..items {
        let id = format!("item-{i}");
        let handle = PlaybackHandle::new(
            stream_item(&id),
            Box::new(RecordingPlayer::new(&id, &log)),
            resolver(),
        );
        handle.load().await.unwrap();
        scheduler.register(&handle);
        handles.push(handle);
    }

    Fixture {
        scheduler,
        aggregator,
        clock,
        log,
        handles,
    }
}

#[tokio::test]
async fn random_batches_never_open_two_sessions_and_credit_exactly() {
    let mut f = fixture(8).await;
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut credited = 0u64;

    for _ in 0..300 {
        f.clock.advance(rng.gen_range(0..400));

        let batch: Vec<ViewabilityRecord> = (0..rng.gen_range(1..4))
            .map(|_| {
                let index = rng.gen_range(0..8);
                let id = format!("item-{index}");
                if rng.gen_bool(0.6) {
                    ViewabilityRecord::visible(id, index, rng.gen_range(0.0..=1.0))
                } else {
                    ViewabilityRecord::hidden(id, index)
                }
            })
            .collect();

        let closed = f.scheduler.on_viewability_changed(&batch).await;
        credited += closed.iter().map(|s| s.duration_ms).sum::<u64>();

        let playing: Vec<&str> = f
            .handles
            .iter()
            .filter(|h| h.is_playing())
            .map(|h| h.item_id())
            .collect();
        assert!(playing.len() <= 1, "two items playing: {playing:?}");
        if let Some(id) = playing.first() {
            assert_eq!(
                f.scheduler.active_session().map(|s| s.content_id.as_str()),
                Some(*id)
            );
        }

        let snapshot = f.aggregator.snapshot().await;
        assert_eq!(snapshot.total_time_ms(), credited);
    }
}

#[tokio::test]
async fn reopening_an_item_starts_a_fresh_contribution() {
    let mut f = fixture(1).await;

    f.clock.set(0);
    f.scheduler
        .on_viewability_changed(&[ViewabilityRecord::visible("item-0", 0, 1.0)])
        .await;
    f.clock.set(100);
    f.scheduler
        .on_viewability_changed(&[ViewabilityRecord::hidden("item-0", 0)])
        .await;
    f.clock.set(1_000);
    f.scheduler
        .on_viewability_changed(&[ViewabilityRecord::visible("item-0", 0, 1.0)])
        .await;
    f.clock.set(1_300);
    f.scheduler
        .on_viewability_changed(&[ViewabilityRecord::hidden("item-0", 0)])
        .await;

    let snapshot = f.aggregator.snapshot().await;
    assert_eq!(snapshot.time_for("item-0"), 400);
    assert_eq!(snapshot.activation_count, 2);
}

#[tokio::test]
async fn repeated_viewable_reports_do_not_reactivate() {
    let mut f = fixture(1).await;

    for _ in 0..3 {
        f.scheduler
            .on_viewability_changed(&[ViewabilityRecord::visible("item-0", 0, 0.9)])
            .await;
    }

    assert_eq!(f.aggregator.snapshot().await.activation_count, 1);
    assert_eq!(count(&f.log, "item-0 play"), 1);
}

#[tokio::test]
async fn survey_fires_at_fifth_and_tenth_activation_only() {
    let mut f = fixture(10).await;
    let mut triggers = f.aggregator.subscribe_to_trigger(5).await;

    let mut fired_at = Vec::new();
    for index in 0..10 {
        f.scheduler
            .on_viewability_changed(&[ViewabilityRecord::visible(
                format!("item-{index}"),
                index,
                1.0,
            )])
            .await;
        while let Ok(trigger) = triggers.try_recv() {
            fired_at.push((index + 1, trigger));
        }
    }

    assert_eq!(
        fired_at,
        vec![
            (5, SurveyTrigger::Activations { count: 5 }),
            (10, SurveyTrigger::Activations { count: 10 })
        ]
    );
    assert_eq!(f.aggregator.snapshot().await.max_scroll_depth, 9);
}

#[tokio::test]
async fn last_viewable_in_a_batch_wins() {
    let mut f = fixture(3).await;

    f.scheduler
        .on_viewability_changed(&[
            ViewabilityRecord::visible("item-0", 0, 0.7),
            ViewabilityRecord::visible("item-1", 1, 0.6),
        ])
        .await;

    assert_eq!(
        f.scheduler.active_session().unwrap().content_id,
        "item-1"
    );
    assert!(!f.handles[0].is_playing());
    assert!(f.handles[1].is_playing());
    assert_eq!(count(&f.log, "item-0 play"), 1);
    assert_eq!(count(&f.log, "item-0 pause"), 1);
}

#[tokio::test]
async fn below_threshold_is_not_an_activation() {
    let mut f = fixture(2).await;

    f.scheduler
        .on_viewability_changed(&[ViewabilityRecord::visible("item-0", 0, 0.49)])
        .await;
    assert!(f.scheduler.active_session().is_none());

    f.scheduler
        .on_viewability_changed(&[ViewabilityRecord::visible("item-0", 0, 0.5)])
        .await;
    assert_eq!(f.scheduler.active_session().unwrap().content_id, "item-0");

    // Dropping below the threshold without going non-viewable keeps the session.
    f.scheduler
        .on_viewability_changed(&[ViewabilityRecord::visible("item-0", 0, 0.2)])
        .await;
    assert_eq!(f.scheduler.active_session().unwrap().content_id, "item-0");
}

#[tokio::test]
async fn dropped_handle_does_not_block_the_batch() {
    let mut f = fixture(2).await;
    let ghost = f.handles.remove(0);
    drop(ghost);

    f.scheduler
        .on_viewability_changed(&[
            ViewabilityRecord::visible("item-0", 0, 1.0),
            ViewabilityRecord::visible("item-1", 1, 1.0),
        ])
        .await;

    assert_eq!(f.scheduler.active_session().unwrap().content_id, "item-1");
    assert!(f.handles[0].is_playing());
    assert_eq!(f.aggregator.snapshot().await.activation_count, 2);
}

#[tokio::test]
async fn rapid_remount_keeps_the_newer_registration() {
    let mut f = fixture(0).await;
    let log = CallLog::default();

    let first = PlaybackHandle::new(
        stream_item("dup"),
        Box::new(RecordingPlayer::new("first", &log)),
        resolver(),
    );
    let second = PlaybackHandle::new(
        stream_item("dup"),
        Box::new(RecordingPlayer::new("second", &log)),
        resolver(),
    );
    f.scheduler.register(&first);
    f.scheduler.register(&second);

    assert!(f.scheduler.unregister(&first).await.is_none());
    assert!(f.scheduler.is_registered("dup"));

    f.scheduler.unregister(&second).await;
    assert!(!f.scheduler.is_registered("dup"));
    assert_eq!(f.scheduler.registered(), 0);
}
