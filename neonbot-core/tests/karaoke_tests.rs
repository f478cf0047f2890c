// tests/karaoke_tests.rs
//
// End-to-end behaviour of the karaoke engine against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

use neonbot_common::models::{ControlOp, ReactionEvent, SessionState};
use neonbot_common::traits::api::LyricsProvider;
use neonbot_common::traits::repository_traits::SettingsStore;
use neonbot_core::Error;
use neonbot_core::karaoke::{
    ControlOutcome, EndReason, KaraokeControl, KaraokeLauncher, KaraokeSession, LaunchRequest,
    SessionRegistry, notices,
};
use neonbot_core::test_utils::helpers::{MemorySettings, RecordingOutput, StaticLyrics, song_from_lines};

const CHANNEL: u64 = 42;
const SINGER: u64 = 7;
const BOT: u64 = 1;

struct Harness {
    registry: SessionRegistry,
    output: Arc<RecordingOutput>,
    lyrics: Arc<StaticLyrics>,
    launcher: KaraokeLauncher,
    control: Arc<KaraokeControl>,
}

impl Harness {
    fn new(lyrics: StaticLyrics) -> Self {
        let registry = SessionRegistry::new();
        let output = Arc::new(RecordingOutput::new());
        let lyrics = Arc::new(lyrics);
        let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettings::new());
        let provider: Arc<dyn LyricsProvider> = lyrics.clone();
        let launcher = KaraokeLauncher::new(registry.clone(), provider, settings, output.clone());
        let control = Arc::new(KaraokeControl::new(registry.clone(), output.clone()));
        control.set_bot_user(Id::new(BOT));
        Self {
            registry,
            output,
            lyrics,
            launcher,
            control,
        }
    }

    fn singing(lines: &[&str]) -> Self {
        Self::new(StaticLyrics::from_song(song_from_lines(lines)))
    }

    async fn launch(&self, delay: f64) -> Arc<KaraokeSession> {
        self.launcher
            .launch(LaunchRequest::new(channel(), "artist - song").with_delay(Some(delay)))
            .await
            .expect("launch should succeed")
    }
}

fn channel() -> Id<ChannelMarker> {
    Id::new(CHANNEL)
}

/// The two ways a user can drive an existing session.
#[derive(Debug, Clone, Copy)]
enum Entry {
    Reaction,
    Command,
}

async fn send(h: &Harness, session: &KaraokeSession, entry: Entry, op: ControlOp) -> ControlOutcome {
    match entry {
        Entry::Command => h.control.apply(channel(), op).await,
        Entry::Reaction => {
            let event = ReactionEvent {
                channel_id: channel(),
                message_id: session.control_surface_id(),
                user_id: Id::new(SINGER),
                emoji: Some(op.glyph().to_string()),
            };
            h.control
                .handle_reaction(&event)
                .await
                .unwrap_or(ControlOutcome::NoSession)
        }
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn scenario_a_blank_lines_are_skipped() {
    let h = Harness::singing(&["Hello", "", "World"]);
    let session = h.launch(0.1).await;
    session.join().await;

    assert_eq!(h.output.lines_sung(), vec!["Hello", "World"]);
    assert_eq!(h.output.count(&notices::started("test song")), 1);
    assert_eq!(h.output.count(&notices::finished("test song")), 1);
    assert_eq!(h.output.texts().len(), 4);
    assert_eq!(session.cursor(), 3);
    assert!(h.registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn scenario_b_resume_continues_from_cursor() {
    let h = Harness::singing(&["a", "b", "c", "d", "e"]);
    let session = h.launch(1.0).await;

    // started notice + "a" + "b"
    h.output.wait_for_emits(3).await;
    assert_eq!(h.control.pause_karaoke(channel()).await, ControlOutcome::Applied(ControlOp::Pause));

    sleep(Duration::from_millis(1500)).await;
    let sung_while_paused = h.output.lines_sung();
    let cursor_while_paused = session.cursor();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.output.lines_sung(), sung_while_paused);
    assert_eq!(session.cursor(), cursor_while_paused);
    assert_eq!(session.state(), SessionState::Paused);

    assert_eq!(h.control.resume_karaoke(channel()).await, ControlOutcome::Applied(ControlOp::Resume));
    session.join().await;

    assert_eq!(h.output.lines_sung(), vec!["a", "b", "c", "d", "e"]);
    assert_eq!(h.output.count(notices::PAUSED), 1);
    assert_eq!(h.output.count(notices::RESUMED), 1);
    assert_eq!(session.end_reason(), Some(EndReason::Finished));
}

#[tokio::test(start_paused = true)]
async fn scenario_c_out_of_range_delay_is_rejected() {
    let h = Harness::singing(&["x"]);
    let result = h
        .launcher
        .launch(LaunchRequest::new(channel(), "q").with_delay(Some(15.0)))
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(h.registry.is_empty());
    assert!(h.output.records().is_empty());
    assert_eq!(h.lyrics.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_rejection_leaves_running_session_alone() {
    let h = Harness::singing(&["a", "b", "c"]);
    let running = h.launch(5.0).await;

    let result = h
        .launcher
        .launch(LaunchRequest::new(channel(), "q").with_delay(Some(0.05)))
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(h.registry.get(channel()).unwrap().id(), running.id());
    assert_eq!(running.state(), SessionState::Running);

    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn scenario_d_missing_lyrics_creates_nothing() {
    for lyrics in [StaticLyrics::not_found(), StaticLyrics::failing()] {
        let h = Harness::new(lyrics);
        let result = h.launcher.launch(LaunchRequest::new(channel(), "nobody - nothing")).await;

        match result {
            Err(Error::NotFound(msg)) => assert!(msg.contains("nobody - nothing")),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(h.output.control_surfaces().is_empty());
        assert!(h.registry.is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn control_surface_failure_leaves_no_session() {
    let h = Harness::singing(&["a"]);
    h.output.fail_control_surface();
    let result = h.launcher.launch(LaunchRequest::new(channel(), "q")).await;
    assert!(matches!(result, Err(Error::Platform(_))));
    assert!(h.registry.is_empty());
}

// ---------------------------------------------------------------------------
// Reaction and command entry points must behave identically
// ---------------------------------------------------------------------------

async fn assert_pause_resume_stop(entry: Entry) {
    let h = Harness::singing(&["one", "two", "three", "four"]);
    let session = h.launch(2.0).await;
    h.output.wait_for_emits(2).await;

    assert_eq!(send(&h, &session, entry, ControlOp::Pause).await, ControlOutcome::Applied(ControlOp::Pause));
    assert_eq!(session.state(), SessionState::Paused);
    assert_eq!(h.output.count(notices::PAUSED), 1);

    // Pausing again changes nothing and posts nothing.
    assert_eq!(
        send(&h, &session, entry, ControlOp::Pause).await,
        ControlOutcome::Unchanged {
            op: ControlOp::Pause,
            state: SessionState::Paused
        }
    );
    assert_eq!(h.output.count(notices::PAUSED), 1);

    assert_eq!(send(&h, &session, entry, ControlOp::Resume).await, ControlOutcome::Applied(ControlOp::Resume));
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(h.output.count(notices::RESUMED), 1);

    assert_eq!(send(&h, &session, entry, ControlOp::Stop).await, ControlOutcome::Applied(ControlOp::Stop));
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.end_reason(), Some(EndReason::UserStop));
    assert!(h.registry.get(channel()).is_none());

    // A second stop finds nothing to act on.
    assert_eq!(send(&h, &session, entry, ControlOp::Stop).await, ControlOutcome::NoSession);

    session.join().await;
    assert_eq!(h.output.count(notices::STOPPED), 1);
    assert_eq!(h.output.count(notices::CANCELLED), 0);
    assert_eq!(h.output.lines_sung(), vec!["one"]);
}

#[tokio::test(start_paused = true)]
async fn reaction_controls_follow_the_shared_contract() {
    assert_pause_resume_stop(Entry::Reaction).await;
}

#[tokio::test(start_paused = true)]
async fn command_controls_follow_the_shared_contract() {
    assert_pause_resume_stop(Entry::Command).await;
}

#[tokio::test(start_paused = true)]
async fn reactions_are_cleared_after_use() {
    let h = Harness::singing(&["one", "two"]);
    let session = h.launch(2.0).await;
    send(&h, &session, Entry::Reaction, ControlOp::Pause).await;
    assert_eq!(h.output.cleared_reactions(), 1);

    // A failing clear does not undo the transition.
    h.output.fail_clear_reaction();
    assert_eq!(
        send(&h, &session, Entry::Reaction, ControlOp::Resume).await,
        ControlOutcome::Applied(ControlOp::Resume)
    );
    session.stop().await;
}

#[tokio::test(start_paused = true)]
async fn irrelevant_reactions_are_ignored() {
    let h = Harness::singing(&["one", "two"]);
    let session = h.launch(2.0).await;
    let base = ReactionEvent {
        channel_id: channel(),
        message_id: session.control_surface_id(),
        user_id: Id::new(SINGER),
        emoji: Some(ControlOp::Pause.glyph().to_string()),
    };

    let from_bot = ReactionEvent {
        user_id: Id::new(BOT),
        ..base.clone()
    };
    let other_message = ReactionEvent {
        message_id: Id::new(1),
        ..base.clone()
    };
    let other_emoji = ReactionEvent {
        emoji: Some("\u{1F600}".into()),
        ..base.clone()
    };
    let custom_emoji = ReactionEvent {
        emoji: None,
        ..base.clone()
    };

    for event in [from_bot, other_message, other_emoji, custom_emoji] {
        assert!(h.control.handle_reaction(&event).await.is_none(), "{event:?}");
    }
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(h.output.cleared_reactions(), 0);
    session.stop().await;
}

#[tokio::test(start_paused = true)]
async fn glyph_without_variation_selector_still_works() {
    let h = Harness::singing(&["one", "two"]);
    let session = h.launch(2.0).await;
    let event = ReactionEvent {
        channel_id: channel(),
        message_id: session.control_surface_id(),
        user_id: Id::new(SINGER),
        emoji: Some("\u{23F8}".into()),
    };
    assert_eq!(
        h.control.handle_reaction(&event).await,
        Some(ControlOutcome::Applied(ControlOp::Pause))
    );
    session.stop().await;
}

// ---------------------------------------------------------------------------
// Stop and supersession
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stop_twice_posts_one_notice() {
    let h = Harness::singing(&["one", "two"]);
    let session = h.launch(2.0).await;

    assert_eq!(session.stop().await, neonbot_core::karaoke::Transition::Applied);
    assert_eq!(
        session.stop().await,
        neonbot_core::karaoke::Transition::NoOp(SessionState::Stopped)
    );
    session.join().await;
    assert_eq!(h.output.count(notices::STOPPED), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_while_paused_ends_playback() {
    let h = Harness::singing(&["one", "two", "three"]);
    let session = h.launch(1.0).await;
    h.output.wait_for_emits(2).await;

    h.control.pause_karaoke(channel()).await;
    sleep(Duration::from_secs(3)).await;
    h.control.stop_karaoke(channel()).await;
    session.join().await;

    assert_eq!(h.output.lines_sung(), vec!["one"]);
    assert_eq!(h.output.count(notices::STOPPED), 1);
    assert!(h.registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn new_launch_supersedes_running_session() {
    let registry = SessionRegistry::new();
    let output = Arc::new(RecordingOutput::new());
    let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettings::new());
    let first_song: Arc<dyn LyricsProvider> = Arc::new(StaticLyrics::from_song(song_from_lines(&[
        "old1", "old2", "old3", "old4", "old5",
    ])));
    let second_song: Arc<dyn LyricsProvider> =
        Arc::new(StaticLyrics::from_song(song_from_lines(&["new1", "new2"])));

    let first_launcher = KaraokeLauncher::new(registry.clone(), first_song, settings.clone(), output.clone());
    let second_launcher = KaraokeLauncher::new(registry.clone(), second_song, settings, output.clone());

    let old = first_launcher
        .launch(LaunchRequest::new(channel(), "old").with_delay(Some(1.0)))
        .await
        .unwrap();
    output.wait_for_emits(3).await;
    let old_lines_before = output.lines_sung().len();

    let new = second_launcher
        .launch(LaunchRequest::new(channel(), "new").with_delay(Some(0.5)))
        .await
        .unwrap();
    old.join().await;

    assert_eq!(old.end_reason(), Some(EndReason::Superseded));
    assert_eq!(registry.get(channel()).unwrap().id(), new.id());
    assert_eq!(registry.live_count(), 1);
    assert_eq!(output.count(notices::CANCELLED), 1);

    new.join().await;
    let sung = output.lines_sung();
    let old_lines_total = sung.iter().filter(|l| l.starts_with("old")).count();
    assert_eq!(old_lines_total, old_lines_before, "old task kept singing: {sung:?}");
    assert_eq!(&sung[sung.len() - 2..], &["new1".to_string(), "new2".to_string()]);
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn at_most_one_live_session_per_channel() {
    let h = Harness::singing(&["a", "b", "c", "d"]);
    let mut sessions = Vec::new();
    for _ in 0..4 {
        sessions.push(h.launch(1.0).await);
        assert_eq!(h.registry.live_count(), 1);
        sleep(Duration::from_millis(300)).await;
    }
    for earlier in &sessions[..3] {
        assert_eq!(earlier.state(), SessionState::Stopped);
    }
    h.registry.shutdown().await;
    assert!(h.registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn sessions_in_different_channels_are_independent() {
    let h = Harness::singing(&["a", "b", "c"]);
    let here = h.launch(1.0).await;
    let there = h
        .launcher
        .launch(LaunchRequest::new(Id::new(CHANNEL + 1), "q").with_delay(Some(1.0)))
        .await
        .unwrap();

    assert_eq!(h.registry.live_count(), 2);
    h.control.stop_karaoke(channel()).await;
    assert_eq!(here.state(), SessionState::Stopped);
    assert_eq!(there.state(), SessionState::Running);
    there.join().await;
    assert_eq!(there.end_reason(), Some(EndReason::Finished));
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_everything() {
    let h = Harness::singing(&["a", "b", "c", "d"]);
    let session = h.launch(2.0).await;
    h.output.wait_for_emits(2).await;

    h.registry.shutdown().await;
    assert!(h.registry.is_empty());
    assert_eq!(session.end_reason(), Some(EndReason::Shutdown));
    assert_eq!(h.output.count(notices::CANCELLED), 1);
    assert_eq!(h.output.lines_sung(), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn cursor_never_decreases_or_overruns() {
    let h = Harness::singing(&["a", "", "b", "c", "", ""]);
    let session = h.launch(0.5).await;
    let mut last = 0;
    while session.is_live() {
        let now = session.cursor();
        assert!(now >= last);
        assert!(now <= session.lines().len());
        last = now;
        sleep(Duration::from_millis(100)).await;
    }
    session.join().await;
    assert_eq!(session.cursor(), session.lines().len());
}
