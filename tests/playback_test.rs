//! Long-form playback tests
//!
//! Musics and speech share one playback slot; these tests check that the
//! slot is exclusive, that forcing preempts promptly and that the slot is
//! always released.

mod common;

use common::{Harness, POLL};
use home_sounds::{ControllerState, PlaybackRequest, SoundsError, Volume};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const LONG: Duration = Duration::from_secs(60);

#[test]
fn test_second_music_conflicts() {
    let h = Harness::new(LONG);
    h.add_music("a.mp3");
    h.add_music("b.mp3");

    h.module.play_music("a.mp3", false).unwrap();
    assert!(matches!(
        h.module.play_music("b.mp3", false),
        Err(SoundsError::Conflict)
    ));

    // the session thread opens its stream after play returns
    let deadline = Instant::now() + Duration::from_secs(2);
    while h.backend.opened_count() < 1 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    thread::sleep(POLL * 2);
    assert_eq!(h.backend.opened_count(), 1);
    h.module.stop_music();
}

#[test]
fn test_forced_music_replaces_current() {
    let h = Harness::new(LONG);
    h.add_music("a.mp3");
    h.add_music("b.mp3");

    h.module.play_music("a.mp3", false).unwrap();
    // wait for the first stream to be open
    while h.backend.opened_count() < 1 {
        thread::sleep(Duration::from_millis(5));
    }

    h.module.play_music("b.mp3", true).unwrap();
    let deadline = Instant::now() + Duration::from_secs(2);
    while h.backend.opened_count() < 2 && Instant::now() < deadline {
        // never more than one stream at a time
        assert!(h.backend.live_streams().len() <= 1);
        thread::sleep(Duration::from_millis(5));
    }

    let live = h.backend.live_streams();
    assert_eq!(live.len(), 1);
    assert!(live[0].ends_with("b.mp3"));
    assert!(h
        .module
        .playback()
        .current()
        .unwrap()
        .path
        .ends_with("b.mp3"));
    h.module.stop_music();
}

#[test]
fn test_play_missing_music() {
    let h = Harness::new(LONG);
    assert!(matches!(
        h.module.play_music("", false),
        Err(SoundsError::MissingParameter(_))
    ));
    assert!(matches!(
        h.module.play_music("nothing.mp3", false),
        Err(SoundsError::InvalidParameter(_))
    ));
    assert_eq!(h.module.playback().state(), ControllerState::Idle);
}

#[test]
fn test_stop_within_poll_interval() {
    let h = Harness::new(LONG);
    h.add_music("a.mp3");
    h.add_music("b.mp3");
    h.module.play_music("a.mp3", false).unwrap();

    let started = Instant::now();
    assert!(h.module.stop_music());
    // one poll interval plus scheduling slack
    assert!(started.elapsed() < POLL * 10);
    assert_eq!(h.module.playback().state(), ControllerState::Idle);

    // slot is free: no force needed
    h.module.play_music("b.mp3", false).unwrap();
    h.module.stop_music();
}

#[test]
fn test_finished_music_frees_slot() {
    let h = Harness::new(Duration::from_millis(50));
    h.add_music("short.ogg");
    h.add_music("next.ogg");

    h.module.play_music("short.ogg", false).unwrap();
    assert!(h.module.playback().wait_idle(Duration::from_secs(2)));
    h.module.play_music("next.ogg", false).unwrap();
}

#[test]
fn test_unplayable_file_does_not_stick_slot() {
    let h = Harness::new(LONG);
    h.add_music("b.mp3");

    // file vanished after it was resolved: the session fails to open it
    h.module
        .playback()
        .play(
            PlaybackRequest {
                path: h.musics_dir().join("gone.mp3"),
                volume: Volume::default(),
                delete_on_finish: false,
            },
            false,
        )
        .unwrap();
    assert!(h.module.playback().wait_idle(Duration::from_secs(2)));

    h.module.play_music("b.mp3", false).unwrap();
    h.module.stop_music();
}

#[test]
fn test_concurrent_forced_plays_leave_one_session() {
    let h = Arc::new(Harness::new(LONG));
    for i in 0..4 {
        h.add_music(&format!("track{}.mp3", i));
    }

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let h = h.clone();
            thread::spawn(move || {
                h.module
                    .play_music(&format!("track{}.mp3", i), true)
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    thread::sleep(POLL * 3);
    assert_eq!(h.backend.live_streams().len(), 1);
    assert_eq!(h.module.playback().state(), ControllerState::Playing);
    h.module.stop_music();
}

#[test]
fn test_rapid_speech_uses_distinct_files() {
    let h = Harness::new(LONG);

    assert!(h.module.speak_text("hello", "en", false).unwrap());
    assert!(h.module.speak_text("hello", "en", true).unwrap());

    let outputs = h.tts.outputs.lock().unwrap().clone();
    assert_eq!(outputs.len(), 2);
    assert_ne!(outputs[0], outputs[1]);

    // the preempted speech file was cleaned up, the current one on stop
    assert!(!outputs[0].exists());
    h.module.stop_music();
    assert!(!outputs[1].exists());
}

#[test]
fn test_speech_conflicts_with_music() {
    let h = Harness::new(LONG);
    h.add_music("a.mp3");
    h.module.play_music("a.mp3", false).unwrap();

    assert!(matches!(
        h.module.speak_text("hello", "en", false),
        Err(SoundsError::Conflict)
    ));
    // refused before any synthesis
    assert!(h.tts.outputs.lock().unwrap().is_empty());
    h.module.stop_music();
}

#[test]
fn test_sounds_overlap_music() {
    let h = Harness::new(LONG);
    h.add_music("a.mp3");
    h.module
        .add_sound(&h.upload("beep.wav", b"audio"))
        .unwrap();

    h.module.play_music("a.mp3", false).unwrap();
    h.module.play_sound("beep.wav").unwrap();
    h.module.play_sound("beep.wav").unwrap();
    assert_eq!(h.module.playback().state(), ControllerState::Playing);
    h.module.stop_music();
}
