//! Long-form playback controller
//!
//! Musics and synthesized speech share a single playback slot: at most one
//! session plays at any instant. Each session runs on its own thread which
//! polls the stream and a cooperative stop flag every `poll_interval`.
//!
//! The slot is only ever acquired under the controller mutex, and the
//! session thread records its terminal state through a drop guard, so the
//! slot is released on every exit path including decoder errors and panics.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::audio::{AudioBackend, AudioError, Volume};
use crate::error::{Result, SoundsError};

/// What to play in a new session
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    /// File to stream
    pub path: PathBuf,
    /// Volume snapshot for the whole session
    pub volume: Volume,
    /// Remove the file once the session ends
    pub delete_on_finish: bool,
}

/// Lifecycle of a single session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Stream is playing
    Playing,
    /// Stop was requested, thread has not exited yet
    Stopping,
    /// Played to the end
    Finished,
    /// Stopped on request
    Stopped,
    /// Ended by an error
    Failed,
}

impl SessionState {
    /// Whether the session still occupies the slot
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Playing | SessionState::Stopping)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Playing,
            1 => SessionState::Stopping,
            2 => SessionState::Finished,
            3 => SessionState::Stopped,
            _ => SessionState::Failed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SessionState::Playing => 0,
            SessionState::Stopping => 1,
            SessionState::Finished => 2,
            SessionState::Stopped => 3,
            SessionState::Failed => 4,
        }
    }
}

/// State of the playback slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Nothing long-form is playing
    Idle,
    /// A session is playing
    Playing,
    /// A session is being stopped
    Stopping,
}

/// Snapshot of the live session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Session identifier, increasing
    pub id: u64,
    /// File being played
    pub path: PathBuf,
    /// Volume the session started with
    pub volume: Volume,
    /// Whether the file is removed afterwards
    pub delete_on_finish: bool,
    /// Current state
    pub state: SessionState,
}

/// State shared between the controller and a session thread
struct SessionShared {
    state: AtomicU8,
    stop: AtomicBool,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Playing.as_u8()),
            stop: AtomicBool::new(false),
        }
    }

    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.state.compare_exchange(
            SessionState::Playing.as_u8(),
            SessionState::Stopping.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

struct Session {
    id: u64,
    request: PlaybackRequest,
    shared: Arc<SessionShared>,
    handle: Option<JoinHandle<()>>,
}

impl Session {
    fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            path: self.request.path.clone(),
            volume: self.request.volume,
            delete_on_finish: self.request.delete_on_finish,
            state: self.shared.state(),
        }
    }

    /// Request a stop and wait for the thread to exit
    fn halt(&mut self) {
        self.shared.request_stop();
        self.reap();
    }

    fn reap(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(session = self.id, "Playback thread panicked");
            }
        }
    }
}

/// Releases the session on every exit path of its thread
struct SessionGuard {
    id: u64,
    shared: Arc<SessionShared>,
    path: PathBuf,
    delete_on_finish: bool,
    outcome: SessionState,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.delete_on_finish {
            debug!(session = self.id, path = %self.path.display(), "Deleting played file");
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "Unable to delete played file");
                }
            }
        }
        self.shared
            .state
            .store(self.outcome.as_u8(), Ordering::SeqCst);
        debug!(session = self.id, state = ?self.outcome, "Playback session ended");
    }
}

/// Single-slot controller for musics and speech
pub struct PlaybackController {
    backend: Arc<dyn AudioBackend>,
    poll_interval: Duration,
    slot: Mutex<Option<Session>>,
    next_id: AtomicU64,
}

impl PlaybackController {
    /// Create an idle controller
    pub fn new(backend: Arc<dyn AudioBackend>, poll_interval: Duration) -> Self {
        Self {
            backend,
            poll_interval,
            slot: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Interval at which sessions check for completion and stop requests
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Current state of the slot
    pub fn state(&self) -> ControllerState {
        match self.lock().as_ref().map(|s| s.shared.state()) {
            Some(SessionState::Playing) => ControllerState::Playing,
            Some(SessionState::Stopping) => ControllerState::Stopping,
            _ => ControllerState::Idle,
        }
    }

    /// Whether a session occupies the slot
    pub fn is_playing(&self) -> bool {
        self.state() != ControllerState::Idle
    }

    /// The live session, if any
    pub fn current(&self) -> Option<SessionInfo> {
        self.lock()
            .as_ref()
            .map(Session::info)
            .filter(|info| info.state.is_live())
    }

    /// Make the slot free, stopping the live session when `force` is set
    ///
    /// Fails with [`SoundsError::Conflict`] if a session is live and
    /// `force` is not set.
    pub fn ensure_available(&self, force: bool) -> Result<()> {
        let mut slot = self.lock();
        Self::preempt(&mut slot, force)
    }

    /// Start a new session
    ///
    /// Returns the session id. The request's file is deleted when the
    /// session ends if `delete_on_finish` is set, even if it never starts.
    pub fn play(&self, request: PlaybackRequest, force: bool) -> Result<u64> {
        let mut slot = self.lock();
        if let Err(e) = Self::preempt(&mut slot, force) {
            // the caller handed us ownership of the file
            if request.delete_on_finish {
                let _ = std::fs::remove_file(&request.path);
            }
            return Err(e);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let shared = Arc::new(SessionShared::new());
        let guard = SessionGuard {
            id,
            shared: shared.clone(),
            path: request.path.clone(),
            delete_on_finish: request.delete_on_finish,
            outcome: SessionState::Failed,
        };

        let backend = self.backend.clone();
        let poll_interval = self.poll_interval;
        let thread_request = request.clone();

        let handle = thread::Builder::new()
            .name(format!("playback-{}", id))
            .spawn(move || run_session(backend, thread_request, guard, poll_interval))
            .map_err(|e| {
                error!(session = id, error = %e, "Unable to spawn playback thread");
                AudioError::StreamError(e.to_string())
            })?;

        info!(
            session = id,
            path = %request.path.display(),
            volume = request.volume.get(),
            "Playback session started"
        );

        *slot = Some(Session {
            id,
            request,
            shared,
            handle: Some(handle),
        });

        Ok(id)
    }

    /// Stop the live session
    ///
    /// Returns true if a session was stopped. Returns once the session
    /// thread has exited, which takes at most about one poll interval.
    pub fn stop(&self) -> bool {
        let mut slot = self.lock();
        let Some(session) = slot.as_mut() else {
            return false;
        };
        let was_live = session.shared.state().is_live();
        if was_live {
            info!(session = session.id, "Stopping playback session");
        }
        session.halt();
        *slot = None;
        was_live
    }

    /// Wait until the slot is idle
    ///
    /// Returns false if `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_playing() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(self.poll_interval.min(Duration::from_millis(20)));
        }
        true
    }

    fn preempt(slot: &mut Option<Session>, force: bool) -> Result<()> {
        let Some(session) = slot.as_mut() else {
            return Ok(());
        };

        if session.shared.state().is_live() {
            if !force {
                debug!(session = session.id, "Playback refused, slot is busy");
                return Err(SoundsError::Conflict);
            }
            info!(session = session.id, "Forcing stop of current playback");
            session.halt();
        } else {
            session.reap();
        }

        *slot = None;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Some(session) = self.lock().as_mut() {
            session.halt();
        }
    }
}

fn run_session(
    backend: Arc<dyn AudioBackend>,
    request: PlaybackRequest,
    mut guard: SessionGuard,
    poll_interval: Duration,
) {
    match play_until_done(backend.as_ref(), &request, &guard.shared, poll_interval) {
        Ok(outcome) => guard.outcome = outcome,
        Err(e) => {
            error!(
                session = guard.id,
                path = %request.path.display(),
                error = %e,
                "Exception during music playing"
            );
            guard.outcome = SessionState::Failed;
        }
    }
}

fn play_until_done(
    backend: &dyn AudioBackend,
    request: &PlaybackRequest,
    shared: &SessionShared,
    poll_interval: Duration,
) -> std::result::Result<SessionState, AudioError> {
    let stream = backend.open_stream(&request.path, request.volume)?;
    debug!(path = %request.path.display(), "Playing music file");

    loop {
        if shared.stop_requested() {
            stream.stop();
            return Ok(SessionState::Stopped);
        }
        if !stream.is_busy() {
            return Ok(SessionState::Finished);
        }
        thread::sleep(poll_interval);
    }
}
