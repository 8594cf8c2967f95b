use std::time::Duration;

use shared::domain::PowerState;

use super::*;
use crate::fake_device::{server_error, unreachable, FakeDevice};

fn red_at(value: u8) -> ChannelControl {
    ChannelControl::new(ChannelName::Red, ChannelIntensity::new(value))
}

fn address() -> DeviceAddress {
    DeviceAddress::new("10.0.0.5")
}

#[test]
fn dragging_tracks_input_without_touching_the_baseline() {
    let mut control = red_at(10);
    control.input(ChannelIntensity::new(40)).expect("input");
    control.input(ChannelIntensity::new(90)).expect("input");

    assert_eq!(control.phase(), ChannelPhase::Dragging);
    assert_eq!(control.displayed(), ChannelIntensity::new(90));
    assert_eq!(control.committed(), ChannelIntensity::new(10));
}

#[test]
fn releasing_on_the_committed_value_skips_the_write() {
    let mut control = red_at(10);
    control.input(ChannelIntensity::new(200)).expect("input");
    control.input(ChannelIntensity::new(10)).expect("input");

    assert_eq!(control.release(), Release::Unchanged);
    assert_eq!(control.phase(), ChannelPhase::Idle);
    assert_eq!(red_at(3).release(), Release::Unchanged);
}

#[test]
fn input_is_refused_while_committing() {
    let mut control = red_at(10);
    control.input(ChannelIntensity::new(50)).expect("input");
    assert_eq!(control.release(), Release::Commit(ChannelIntensity::new(50)));

    assert!(!control.is_interactive());
    assert_eq!(
        control.input(ChannelIntensity::new(60)),
        Err(ChannelControlError::Busy(ChannelName::Red))
    );
    assert_eq!(control.release(), Release::Busy);
    assert_eq!(control.displayed(), ChannelIntensity::new(50));
}

#[test]
fn finish_without_a_write_in_flight_is_an_error() {
    let mut control = red_at(10);
    assert_eq!(
        control.finish(Ok(true)),
        Err(ChannelControlError::NotCommitting(ChannelName::Red))
    );
}

#[test]
fn successful_write_promotes_every_value_to_committed() {
    for raw in [0u8, 1, 127, 128, 254, 255] {
        let mut control = red_at(if raw == 0 { 1 } else { 0 });
        let value = ChannelIntensity::new(raw);
        control.input(value).expect("input");
        assert_eq!(control.release(), Release::Commit(value));

        assert_eq!(
            control.finish(Ok(true)),
            Ok(CommitOutcome::Committed(value))
        );
        assert_eq!(control.committed(), value);
        assert_eq!(control.displayed(), value);
        assert_eq!(control.phase(), ChannelPhase::Idle);
        assert_eq!(control.error(), None);
    }
}

#[test]
fn failed_write_reverts_and_shows_error_until_next_input() {
    let mut control = red_at(10);
    control.input(ChannelIntensity::new(99)).expect("input");
    control.release();

    let outcome = control
        .finish(Err(server_error("update channel")))
        .expect("finish");

    assert_eq!(
        outcome,
        CommitOutcome::Reverted {
            to: ChannelIntensity::new(10),
            reason: "failed to update channel: 500 Internal Server Error".to_string(),
        }
    );
    assert_eq!(control.displayed(), ChannelIntensity::new(10));
    assert_eq!(control.committed(), ChannelIntensity::new(10));
    assert!(control.error().is_some());
    assert!(control.is_interactive());

    control.input(ChannelIntensity::new(11)).expect("input");
    assert_eq!(control.error(), None);
}

#[test]
fn rejected_write_counts_as_failure() {
    let mut control = ChannelControl::new(ChannelName::WarmWhite, ChannelIntensity::new(5));
    control.input(ChannelIntensity::new(6)).expect("input");
    control.release();

    let outcome = control.finish(Ok(false)).expect("finish");

    assert!(matches!(outcome, CommitOutcome::Reverted { to, .. } if to == ChannelIntensity::new(5)));
    assert_eq!(control.error(), Some("device rejected Warm White = 6"));
}

#[test]
fn sync_moves_display_only_when_idle() {
    let mut control = red_at(10);
    control.sync_committed(ChannelIntensity::new(20));
    assert_eq!(control.displayed(), ChannelIntensity::new(20));

    control.input(ChannelIntensity::new(70)).expect("input");
    control.sync_committed(ChannelIntensity::new(30));
    assert_eq!(control.displayed(), ChannelIntensity::new(70));
    assert_eq!(control.committed(), ChannelIntensity::new(30));
}

#[tokio::test]
async fn commit_writes_once_and_skips_repeats() {
    let device = FakeDevice::new(PowerState::On, &[("red", 10)]);
    let mut control = red_at(10);

    control.input(ChannelIntensity::new(128)).expect("input");
    assert_eq!(
        control.commit(&device, &address()).await,
        CommitOutcome::Committed(ChannelIntensity::new(128))
    );

    // Same value again: no new write.
    control.input(ChannelIntensity::new(128)).expect("input");
    assert_eq!(control.commit(&device, &address()).await, CommitOutcome::Unchanged);
    assert_eq!(control.commit(&device, &address()).await, CommitOutcome::Unchanged);

    assert_eq!(
        device.writes().await,
        vec![(ChannelName::Red, ChannelIntensity::new(128))]
    );
}

#[tokio::test]
async fn commit_failure_leaves_committed_value_untouched() {
    let device = FakeDevice::new(PowerState::On, &[]);
    device.fail_writes(unreachable("10.0.0.5")).await;
    let mut control = red_at(42);

    control.input(ChannelIntensity::new(0)).expect("input");
    let outcome = control.commit(&device, &address()).await;

    assert!(matches!(outcome, CommitOutcome::Reverted { .. }));
    assert_eq!(control.committed(), ChannelIntensity::new(42));
    assert_eq!(control.displayed(), ChannelIntensity::new(42));
    assert_eq!(device.writes().await.len(), 1);
}

#[tokio::test]
async fn controls_for_different_channels_write_independently() {
    let device = FakeDevice::new(PowerState::On, &[]).with_latency(Duration::from_millis(20));
    let mut red = red_at(0);
    let mut blue = ChannelControl::new(ChannelName::Blue, ChannelIntensity::MIN);
    red.input(ChannelIntensity::new(1)).expect("input");
    blue.input(ChannelIntensity::new(2)).expect("input");

    let addr = address();
    let (red_outcome, blue_outcome) =
        tokio::join!(red.commit(&device, &addr), blue.commit(&device, &addr));

    assert_eq!(red_outcome, CommitOutcome::Committed(ChannelIntensity::new(1)));
    assert_eq!(blue_outcome, CommitOutcome::Committed(ChannelIntensity::new(2)));
    assert_eq!(device.writes().await.len(), 2);
}
