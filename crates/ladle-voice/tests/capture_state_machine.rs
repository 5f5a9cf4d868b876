//! Integration tests for the `SpeechCapture` state machine.
//!
//! A scripted recognition engine stands in for the platform recognizer. It
//! counts every control call and lets the test fire listener callbacks the
//! way a real engine would. Timer-driven tests run on a paused tokio clock.
//!
//! # What is tested
//!
//! - Idempotent `start()` / `stop()` guards
//! - Silence auto-stop armed by finalized segments only
//! - Engine error code mapping and start failures
//! - Late finals after stop, engine-initiated end, reset, and dispose

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ladle_voice::{
    CaptureConfig, CaptureError, CaptureEvent, CaptureStatus, RecognitionEngine, RecognitionHost,
    RecognitionListener, RecognitionOptions, RecognitionResult, RecognitionSegment, SpeechCapture,
};
use tokio::sync::mpsc::UnboundedReceiver;

// ── Scripted engine ────────────────────────────────────────────────

#[derive(Default)]
struct ScriptedEngine {
    listener: Mutex<Option<Arc<dyn RecognitionListener>>>,
    options: Mutex<Option<RecognitionOptions>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    aborts: AtomicUsize,
    /// `start()` returns this error instead of confirming.
    refuse_with: Mutex<Option<String>>,
    /// Fire `on_start` synchronously from `start()`.
    confirm_on_start: AtomicBool,
}

impl ScriptedEngine {
    fn confirming() -> Arc<Self> {
        let engine = Self::default();
        engine.confirm_on_start.store(true, Ordering::SeqCst);
        Arc::new(engine)
    }

    fn listener(&self) -> Option<Arc<dyn RecognitionListener>> {
        self.listener.lock().unwrap().clone()
    }

    fn fire_start(&self) {
        if let Some(listener) = self.listener() {
            listener.on_start();
        }
    }

    fn fire_result(&self, segments: Vec<RecognitionSegment>) {
        if let Some(listener) = self.listener() {
            listener.on_result(RecognitionResult::from_segments(segments));
        }
    }

    fn fire_final(&self, text: &str) {
        self.fire_result(vec![RecognitionSegment::finalized(text)]);
    }

    fn fire_interim(&self, text: &str) {
        self.fire_result(vec![RecognitionSegment::interim(text)]);
    }

    fn fire_end(&self) {
        if let Some(listener) = self.listener() {
            listener.on_end();
        }
    }

    fn fire_error(&self, code: &str) {
        if let Some(listener) = self.listener() {
            listener.on_error(code);
        }
    }

    fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }
}

impl RecognitionEngine for ScriptedEngine {
    fn configure(&self, options: &RecognitionOptions) {
        *self.options.lock().unwrap() = Some(options.clone());
    }

    fn set_listener(&self, listener: Option<Arc<dyn RecognitionListener>>) {
        *self.listener.lock().unwrap() = listener;
    }

    fn start(&self) -> Result<(), String> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.refuse_with.lock().unwrap().clone() {
            return Err(message);
        }
        if self.confirm_on_start.load(Ordering::SeqCst) {
            self.fire_start();
        }
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        // Real engines report the end after stop().
        self.fire_end();
    }

    fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

struct StaticHost(Option<Arc<ScriptedEngine>>);

impl RecognitionHost for StaticHost {
    fn recognition_engine(&self) -> Option<Arc<dyn RecognitionEngine>> {
        self.0
            .clone()
            .map(|engine| engine as Arc<dyn RecognitionEngine>)
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn capture_over(engine: &Arc<ScriptedEngine>) -> (SpeechCapture, UnboundedReceiver<CaptureEvent>) {
    let engine: Arc<dyn RecognitionEngine> = Arc::clone(engine) as Arc<dyn RecognitionEngine>;
    SpeechCapture::new(Some(engine), CaptureConfig::default())
}

/// Drain all pending events from the event receiver and return them.
fn drain_events(rx: &mut UnboundedReceiver<CaptureEvent>) -> Vec<CaptureEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

fn statuses_from(events: &[CaptureEvent]) -> Vec<CaptureStatus> {
    events
        .iter()
        .filter_map(|e| {
            if let CaptureEvent::StatusChanged(s) = e {
                Some(*s)
            } else {
                None
            }
        })
        .collect()
}

fn auto_stops(events: &[CaptureEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, CaptureEvent::AutoStopped))
        .count()
}

// ── Lifecycle ──────────────────────────────────────────────────────

#[test]
fn new_controller_configures_engine() {
    let engine = ScriptedEngine::confirming();
    let (capture, _rx) = capture_over(&engine);

    assert!(capture.is_supported());
    assert_eq!(capture.status(), CaptureStatus::Idle);
    let options = engine.options.lock().unwrap().clone().unwrap();
    assert_eq!(options.language, "en-US");
    assert!(options.continuous);
    assert!(options.interim_results);
}

#[test]
fn detect_uses_host_engine() {
    let engine = ScriptedEngine::confirming();
    let (capture, _rx) = SpeechCapture::detect(
        &StaticHost(Some(Arc::clone(&engine))),
        CaptureConfig::default().with_language("de-DE"),
    );
    assert!(capture.is_supported());
    assert_eq!(
        engine.options.lock().unwrap().as_ref().map(|o| o.language.clone()),
        Some("de-DE".to_string())
    );

    let (inert, _rx) = SpeechCapture::detect(&StaticHost(None), CaptureConfig::default());
    assert!(!inert.is_supported());
}

#[test]
fn start_enters_listening_on_engine_confirmation() {
    let engine = Arc::new(ScriptedEngine::default());
    let (capture, mut rx) = capture_over(&engine);

    capture.start();
    assert_eq!(engine.starts(), 1);
    assert_eq!(capture.status(), CaptureStatus::Idle, "not confirmed yet");

    // A second start while the first is pending is ignored.
    capture.start();
    assert_eq!(engine.starts(), 1);

    engine.fire_start();
    assert!(capture.is_listening());
    assert_eq!(statuses_from(&drain_events(&mut rx)), vec![CaptureStatus::Listening]);
}

#[test]
fn start_while_listening_is_idempotent() {
    let engine = ScriptedEngine::confirming();
    let (capture, mut rx) = capture_over(&engine);

    capture.start();
    engine.fire_final("chicken");
    drain_events(&mut rx);

    capture.start();
    capture.start();

    assert_eq!(engine.starts(), 1);
    assert_eq!(engine.stops(), 0);
    assert_eq!(capture.status(), CaptureStatus::Listening);
    assert_eq!(capture.transcript().finalized, "chicken");
    assert!(drain_events(&mut rx).is_empty());
}

#[test]
fn stop_while_idle_is_noop() {
    let engine = ScriptedEngine::confirming();
    let (capture, mut rx) = capture_over(&engine);

    capture.stop();
    capture.stop();

    assert_eq!(engine.stops(), 0);
    assert_eq!(capture.status(), CaptureStatus::Idle);
    assert!(capture.error().is_none());
    assert!(drain_events(&mut rx).is_empty());
}

#[test]
fn stop_returns_to_idle_and_keeps_finalized_text() {
    let engine = ScriptedEngine::confirming();
    let (capture, _rx) = capture_over(&engine);

    capture.start();
    engine.fire_result(vec![
        RecognitionSegment::finalized("garlic "),
        RecognitionSegment::interim("bre"),
    ]);
    assert_eq!(capture.transcript().text(), "garlic bre");

    capture.stop();
    assert_eq!(engine.stops(), 1);
    assert_eq!(capture.status(), CaptureStatus::Idle);
    let transcript = capture.transcript();
    assert_eq!(transcript.finalized, "garlic ");
    assert!(transcript.interim.is_empty());

    capture.stop();
    assert_eq!(engine.stops(), 1, "second stop is a no-op");
}

#[test]
fn toggle_alternates_start_and_stop() {
    let engine = ScriptedEngine::confirming();
    let (capture, _rx) = capture_over(&engine);

    capture.toggle();
    assert!(capture.is_listening());
    capture.toggle();
    assert_eq!(capture.status(), CaptureStatus::Idle);
    assert_eq!((engine.starts(), engine.stops()), (1, 1));
}

#[test]
fn new_session_clears_previous_transcript() {
    let engine = ScriptedEngine::confirming();
    let (capture, _rx) = capture_over(&engine);

    capture.start();
    engine.fire_final("salmon");
    capture.stop();
    assert_eq!(capture.transcript().finalized, "salmon");

    capture.start();
    assert!(capture.transcript().is_empty());
    engine.fire_final("tofu");
    assert_eq!(capture.transcript().finalized, "tofu");
}

// ── Transcript ─────────────────────────────────────────────────────

#[test]
fn interim_text_is_replaced_not_appended() {
    let engine = ScriptedEngine::confirming();
    let (capture, mut rx) = capture_over(&engine);

    capture.start();
    engine.fire_interim("chick");
    engine.fire_interim("chicken cur");
    engine.fire_result(vec![
        RecognitionSegment::finalized("chicken curry"),
    ]);

    let transcript = capture.transcript();
    assert_eq!(transcript.finalized, "chicken curry");
    assert!(transcript.interim.is_empty());

    let updates = drain_events(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, CaptureEvent::TranscriptUpdated(_)))
        .count();
    assert_eq!(updates, 3);
}

#[test]
fn late_finals_after_stop_are_kept() {
    let engine = ScriptedEngine::confirming();
    let (capture, _rx) = capture_over(&engine);

    capture.start();
    engine.fire_final("beef ");
    capture.stop();

    engine.fire_result(vec![
        RecognitionSegment::finalized("stew"),
        RecognitionSegment::interim("ignored"),
    ]);
    let transcript = capture.transcript();
    assert_eq!(transcript.finalized, "beef stew");
    assert!(transcript.interim.is_empty());
    assert_eq!(capture.status(), CaptureStatus::Idle);
}

#[test]
fn engine_initiated_end_returns_to_idle() {
    let engine = ScriptedEngine::confirming();
    let (capture, mut rx) = capture_over(&engine);

    capture.start();
    engine.fire_interim("pas");
    drain_events(&mut rx);

    engine.fire_end();
    assert_eq!(capture.status(), CaptureStatus::Idle);
    assert!(capture.transcript().interim.is_empty());
    assert_eq!(engine.stops(), 0);
    assert_eq!(statuses_from(&drain_events(&mut rx)), vec![CaptureStatus::Idle]);
}

// ── Errors ─────────────────────────────────────────────────────────

#[test]
fn engine_error_codes_map_to_kinds() {
    let cases = [
        ("no-speech", CaptureError::NoSpeechDetected),
        ("audio-capture", CaptureError::MicrophoneUnavailable),
        ("not-allowed", CaptureError::PermissionDenied),
        ("network", CaptureError::NetworkError),
        ("service-not-allowed", CaptureError::ServiceNotAllowed),
        ("bad-grammar", CaptureError::Unknown("bad-grammar".into())),
    ];

    for (code, expected) in cases {
        let engine = ScriptedEngine::confirming();
        let (capture, mut rx) = capture_over(&engine);
        capture.start();
        engine.fire_error(code);

        assert_eq!(capture.status(), CaptureStatus::Error, "code {code}");
        assert_eq!(capture.error(), Some(expected.clone()), "code {code}");
        assert!(drain_events(&mut rx).contains(&CaptureEvent::Error(expected)));
    }
}

#[test]
fn engine_start_failure_enters_error() {
    let engine = Arc::new(ScriptedEngine::default());
    *engine.refuse_with.lock().unwrap() = Some("already started".into());
    let (capture, mut rx) = capture_over(&engine);

    capture.start();
    assert_eq!(capture.status(), CaptureStatus::Error);
    assert_eq!(
        capture.error(),
        Some(CaptureError::EngineStartFailure("already started".into()))
    );
    assert!(matches!(
        drain_events(&mut rx).last(),
        Some(CaptureEvent::Error(CaptureError::EngineStartFailure(_)))
    ));

    // Not stuck in a pending start: the next attempt reaches the engine.
    *engine.refuse_with.lock().unwrap() = None;
    engine.confirm_on_start.store(true, Ordering::SeqCst);
    capture.start();
    assert_eq!(engine.starts(), 2);
    assert!(capture.is_listening());
    assert!(capture.error().is_none());
}

#[test]
fn reset_clears_error_and_transcript() {
    let engine = ScriptedEngine::confirming();
    let (capture, _rx) = capture_over(&engine);

    capture.start();
    engine.fire_final("lentil");
    engine.fire_error("network");
    assert_eq!(capture.status(), CaptureStatus::Error);

    capture.reset();
    assert_eq!(capture.status(), CaptureStatus::Idle);
    assert!(capture.error().is_none());
    assert!(capture.transcript().is_empty());
}

#[test]
fn reset_abandons_unconfirmed_start() {
    let engine = Arc::new(ScriptedEngine::default());
    let (capture, _rx) = capture_over(&engine);

    // The engine never confirms or errors.
    capture.start();
    capture.start();
    assert_eq!(engine.starts(), 1);

    capture.reset();
    capture.start();
    assert_eq!(engine.starts(), 2);

    engine.fire_start();
    assert!(capture.is_listening());
}

// ── Silence timer ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn finalized_segment_auto_stops_after_silence() {
    let engine = ScriptedEngine::confirming();
    let (capture, mut rx) = capture_over(&engine);

    capture.start();
    engine.fire_final("chicken");

    tokio::time::sleep(Duration::from_millis(2999)).await;
    assert_eq!(engine.stops(), 0);
    assert!(capture.is_listening());

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(engine.stops(), 1);
    assert_eq!(capture.status(), CaptureStatus::Idle);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(engine.stops(), 1, "auto-stop fires exactly once");
    assert_eq!(auto_stops(&drain_events(&mut rx)), 1);
    assert_eq!(capture.transcript().finalized, "chicken");
}

#[tokio::test(start_paused = true)]
async fn each_finalized_segment_restarts_the_countdown() {
    let engine = ScriptedEngine::confirming();
    let (capture, _rx) = capture_over(&engine);

    capture.start();
    engine.fire_final("chicken ");
    tokio::time::sleep(Duration::from_millis(2000)).await;
    engine.fire_final("tikka");

    tokio::time::sleep(Duration::from_millis(2999)).await;
    assert_eq!(engine.stops(), 0);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(engine.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn interim_only_update_does_not_arm_timer() {
    let engine = ScriptedEngine::confirming();
    let (capture, mut rx) = capture_over(&engine);

    capture.start();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    engine.fire_interim("chick");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(engine.stops(), 0);
    assert!(capture.is_listening());
    assert_eq!(auto_stops(&drain_events(&mut rx)), 0);
}

#[tokio::test(start_paused = true)]
async fn interim_update_does_not_reset_timer() {
    let engine = ScriptedEngine::confirming();
    let (capture, _rx) = capture_over(&engine);

    capture.start();
    engine.fire_final("chicken");
    tokio::time::sleep(Duration::from_millis(1000)).await;
    engine.fire_interim("thi");

    // Still measured from the finalized segment at t=0.
    tokio::time::sleep(Duration::from_millis(2001)).await;
    assert_eq!(engine.stops(), 1);
    assert_eq!(capture.status(), CaptureStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn manual_stop_cancels_pending_auto_stop() {
    let engine = ScriptedEngine::confirming();
    let (capture, mut rx) = capture_over(&engine);

    capture.start();
    engine.fire_final("soup");
    tokio::time::sleep(Duration::from_millis(1500)).await;
    capture.stop();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.stops(), 1);
    assert_eq!(auto_stops(&drain_events(&mut rx)), 0);
}

#[tokio::test(start_paused = true)]
async fn finals_from_engine_thread_still_auto_stop() {
    let engine = ScriptedEngine::confirming();
    let engine_dyn: Arc<dyn RecognitionEngine> = Arc::clone(&engine) as Arc<dyn RecognitionEngine>;
    let (capture, mut rx) = SpeechCapture::new(
        Some(engine_dyn),
        CaptureConfig::default().with_silence_timeout(Duration::from_millis(250)),
    );
    capture.start();

    let recognizer = Arc::clone(&engine);
    std::thread::spawn(move || recognizer.fire_final("chicken"))
        .join()
        .unwrap();
    assert_eq!(capture.transcript().finalized, "chicken");

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(capture.status(), CaptureStatus::Idle);
    assert_eq!(engine.stops(), 1);
    assert_eq!(auto_stops(&drain_events(&mut rx)), 1);
}

#[tokio::test(start_paused = true)]
async fn custom_silence_timeout_is_honoured() {
    let engine = ScriptedEngine::confirming();
    let engine_dyn: Arc<dyn RecognitionEngine> = Arc::clone(&engine) as Arc<dyn RecognitionEngine>;
    let (capture, _rx) = SpeechCapture::new(
        Some(engine_dyn),
        CaptureConfig::default().with_silence_timeout(Duration::from_millis(500)),
    );

    capture.start();
    engine.fire_final("rice");
    tokio::time::sleep(Duration::from_millis(501)).await;
    assert_eq!(engine.stops(), 1);
}

// ── Dispose ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn dispose_aborts_engine_and_cancels_timer() {
    let engine = ScriptedEngine::confirming();
    let (capture, mut rx) = capture_over(&engine);

    capture.start();
    engine.fire_final("noodles");
    capture.dispose();

    assert_eq!(engine.aborts(), 1);
    assert!(engine.listener().is_none(), "listener detached");
    assert_eq!(capture.status(), CaptureStatus::Idle);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.stops(), 0);
    assert_eq!(auto_stops(&drain_events(&mut rx)), 0);

    // Further calls are inert.
    capture.start();
    capture.dispose();
    assert_eq!(engine.starts(), 1);
    assert_eq!(engine.aborts(), 1);
}

#[test]
fn dropping_controller_disposes_it() {
    let engine = ScriptedEngine::confirming();
    let (capture, _rx) = capture_over(&engine);
    capture.start();

    drop(capture);
    assert_eq!(engine.aborts(), 1);
    assert!(engine.listener().is_none());
}
