//! StreamSession / ThemeMixer integration tests
//!
//! Pause/resume positioning, silence substitution, mixing, pacing, teardown
//! and MP3 output.

mod helpers;

use amniotic_stream::audio::{Chunk, CHUNK_SIZE};
use amniotic_stream::stream::mixer::DECODER_RETRY_TICKS;
use amniotic_stream::stream::{
    spawn_session, SessionConfig, StreamMetrics, StreamSession, ThemeMixer,
};
use amniotic_stream::theme::Theme;
use helpers::TestLibrary;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn offline() -> SessionConfig {
    SessionConfig {
        bitrate_kbps: 128,
        realtime: false,
    }
}

fn theme_with(lib: &TestLibrary, names: &[&str]) -> Arc<Theme> {
    let library = lib.library();
    let theme = Arc::new(Theme::new("test").unwrap());
    for name in names {
        let binding = theme.add_binding(library.require(name).unwrap());
        binding.set_volume(1.0);
        binding.set_enabled(true);
    }
    theme
}

#[test]
fn test_empty_theme_is_silent() {
    let theme = Arc::new(Theme::new("nothing").unwrap());
    let mut session = StreamSession::new(theme, offline(), StreamMetrics::new()).unwrap();
    for _ in 0..50 {
        assert!(session.next_frame().unwrap().pcm.is_silent());
    }
}

#[test]
fn test_all_disabled_is_silent() {
    let lib = TestLibrary::new();
    lib.add_constant("tone", 9_000, 1.0);
    let theme = theme_with(&lib, &["tone"]);
    theme.binding("tone").unwrap().set_enabled(false);

    let mut mixer = ThemeMixer::new(theme, StreamMetrics::new());
    for _ in 0..20 {
        assert!(mixer.next_chunk().is_silent());
    }
    // Never enabled, so never opened
    assert_eq!(mixer.open_decoders(), 0);
}

#[test]
fn test_two_tracks_are_averaged() {
    let lib = TestLibrary::new();
    lib.add_constant("high", 10_000, 1.0);
    lib.add_constant("low", 2_001, 1.0);
    let theme = theme_with(&lib, &["high", "low"]);

    let mut mixer = ThemeMixer::new(theme, StreamMetrics::new());
    for _ in 0..10 {
        // round((10000 + 2001) / 2) = 6001
        assert!(mixer.next_chunk().samples().iter().all(|&s| s == 6_001));
    }
    assert_eq!(mixer.open_decoders(), 2);
}

#[test]
fn test_pause_resume_keeps_position() {
    let lib = TestLibrary::new();
    lib.add_ramp("marker", 30_000);
    let theme = theme_with(&lib, &["marker"]);
    let binding = theme.binding("marker").unwrap();

    let mut mixer = ThemeMixer::new(Arc::clone(&theme), StreamMetrics::new());
    let mut last = Chunk::silence();
    for _ in 0..5 {
        last = mixer.next_chunk();
    }
    assert_eq!(last.samples()[CHUNK_SIZE - 1] as usize, 5 * CHUNK_SIZE - 1);

    binding.set_enabled(false);
    for _ in 0..7 {
        assert!(mixer.next_chunk().is_silent());
    }
    // Disabled decoders stay open
    assert_eq!(mixer.open_decoders(), 1);
    assert_eq!(mixer.decoder_chunks(binding.id()), Some(5));

    binding.set_enabled(true);
    let resumed = mixer.next_chunk();
    assert_eq!(resumed.samples()[0] as usize, 5 * CHUNK_SIZE);
}

#[test]
fn test_removed_binding_closes_decoder() {
    let lib = TestLibrary::new();
    lib.add_constant("tone", 4_000, 1.0);
    let theme = theme_with(&lib, &["tone"]);

    let metrics = StreamMetrics::new();
    let mut mixer = ThemeMixer::new(Arc::clone(&theme), Arc::clone(&metrics));
    mixer.next_chunk();
    assert_eq!(metrics.open_decoders(), 1);

    theme.remove_binding("tone").unwrap();
    assert!(mixer.next_chunk().is_silent());
    assert_eq!(mixer.open_decoders(), 0);
    assert_eq!(metrics.open_decoders(), 0);
}

#[test]
fn test_broken_track_does_not_silence_others() {
    let lib = TestLibrary::new();
    lib.add_constant("good", 6_000, 1.0);
    helpers::write_text_file(lib.path("broken.mp3")).unwrap();
    let theme = theme_with(&lib, &["good", "broken"]);

    let metrics = StreamMetrics::new();
    let mut mixer = ThemeMixer::new(theme, Arc::clone(&metrics));
    for _ in 0..5 {
        // The broken slot contributes silence to the average
        assert!(mixer.next_chunk().samples().iter().all(|&s| s == 3_000));
    }
    assert_eq!(metrics.snapshot().decoder_failures, 1);
    assert_eq!(metrics.open_decoders(), 1);
}

#[test]
fn test_track_failing_mid_stream_recovers() {
    let lib = TestLibrary::new();
    let path = lib.add_constant("short", 4_000, 0.1);
    let theme = theme_with(&lib, &["short"]);

    let metrics = StreamMetrics::new();
    let mut session = StreamSession::new(theme, offline(), Arc::clone(&metrics)).unwrap();
    for _ in 0..3 {
        assert!(session.next_frame().unwrap().pcm.samples().iter().all(|&s| s == 4_000));
    }
    assert_eq!(metrics.open_decoders(), 1);

    // The open handle reads to the end; the reopen for the next loop fails
    let contents = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    let mut ticks = 0;
    while !session.next_frame().unwrap().pcm.is_silent() {
        ticks += 1;
        assert!(ticks < 20, "stream never went silent after the file was removed");
    }
    assert_eq!(metrics.snapshot().decoder_failures, 1);
    assert_eq!(metrics.open_decoders(), 0);
    assert_eq!(metrics.active_sessions(), 1);

    // Silent while the slot waits out its back-off
    for _ in 0..10 {
        assert!(session.next_frame().unwrap().pcm.is_silent());
    }

    std::fs::write(&path, contents).unwrap();
    let recovered = (0..DECODER_RETRY_TICKS).any(|_| {
        session
            .next_frame()
            .unwrap()
            .pcm
            .samples()
            .iter()
            .all(|&s| s == 4_000)
    });
    assert!(recovered, "track did not come back within the retry back-off");
    assert_eq!(metrics.snapshot().decoder_failures, 1);
    assert_eq!(metrics.open_decoders(), 1);
}

#[test]
fn test_session_emits_mp3() {
    let lib = TestLibrary::new();
    lib.add_constant("tone", 7_000, 1.0);
    let theme = theme_with(&lib, &["tone"]);

    let session = StreamSession::new(theme, offline(), StreamMetrics::new()).unwrap();
    let bytes: Vec<u8> = session.take(10).flat_map(|b| b.to_vec()).collect();
    assert!(!bytes.is_empty());
    assert!(bytes
        .windows(2)
        .any(|w| w[0] == 0xFF && (w[1] & 0xE0) == 0xE0));
}

#[test]
fn test_invalid_bitrate_rejected() {
    let theme = Arc::new(Theme::new("x").unwrap());
    let metrics = StreamMetrics::new();
    let config = SessionConfig {
        bitrate_kbps: 100,
        realtime: false,
    };
    assert!(StreamSession::new(theme, config, Arc::clone(&metrics)).is_err());
    assert_eq!(metrics.active_sessions(), 0);
    assert_eq!(metrics.open_encoders(), 0);
}

#[test]
fn test_pacing_bound() {
    let theme = Arc::new(Theme::new("paced").unwrap());
    let config = SessionConfig {
        bitrate_kbps: 64,
        realtime: true,
    };
    let mut session = StreamSession::new(theme, config, StreamMetrics::new()).unwrap();

    let started = Instant::now();
    let frame = Chunk::duration_secs();
    for _ in 0..20 {
        session.next_frame().unwrap();
        let wall = started.elapsed().as_secs_f64();
        assert!(
            session.audio_time() <= wall + frame + 0.002,
            "audio {:.3}s ran ahead of wall clock {:.3}s",
            session.audio_time(),
            wall
        );
    }
    // 20 frames is ~464 ms of audio; pacing must have held us near real time
    assert!(started.elapsed() >= Duration::from_secs_f64(19.0 * frame));
}

#[test]
fn test_teardown_releases_resources() {
    let lib = TestLibrary::new();
    lib.add_constant("a", 1_000, 1.0);
    lib.add_constant("b", 2_000, 1.0);
    let theme = theme_with(&lib, &["a", "b"]);
    let metrics = StreamMetrics::new();

    {
        let mut session =
            StreamSession::new(Arc::clone(&theme), offline(), Arc::clone(&metrics)).unwrap();
        for _ in 0..10 {
            session.next_frame().unwrap();
        }
        assert_eq!(metrics.active_sessions(), 1);
        assert_eq!(metrics.open_decoders(), 2);
        assert_eq!(metrics.open_encoders(), 1);
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.active_sessions, 0);
    assert_eq!(snapshot.open_decoders, 0);
    assert_eq!(snapshot.open_encoders, 0);
    assert_eq!(snapshot.sessions_started, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_spawned_session_stops_when_receiver_dropped() {
    let lib = TestLibrary::new();
    lib.add_constant("tone", 5_000, 1.0);
    let theme = theme_with(&lib, &["tone"]);
    let metrics = StreamMetrics::new();

    let mut rx = spawn_session(theme, offline(), Arc::clone(&metrics))
        .await
        .unwrap();
    for _ in 0..3 {
        assert!(!rx.recv().await.unwrap().is_empty());
    }
    assert_eq!(metrics.active_sessions(), 1);
    drop(rx);

    let deadline = Instant::now() + Duration::from_secs(5);
    while metrics.active_sessions() > 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(metrics.active_sessions(), 0);
    assert_eq!(metrics.open_decoders(), 0);
    assert_eq!(metrics.open_encoders(), 0);
}
