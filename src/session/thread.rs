//! The camera thread: one OS thread that owns every session and serializes
//! all of their inputs through a single command queue.

use crate::assert_invariant;
use crate::errors::CameraError;
use crate::invariant_ppt::{record_invariant, CAMERA_THREAD_CONFINEMENT};
use crate::session::backend::{
    CameraEvent, CameraEventSender, CameraManager, CaptureSessionEvent, DeviceEvent,
    StillCaptureOptions, StillImage, SurfaceTextureHelper,
};
use crate::session::camera2::{
    Camera2Session, FlashOutcome, SessionHost, SessionOptions, SessionRequest,
};
use crate::session::events::{CameraEvents, CreateOutcome, CreateSessionCallback};
use crate::session::handle::SessionHandle;
use crate::session::state::SessionId;
use crate::timing::SessionStats;
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::oneshot;

/// Remembers the thread it was created on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadChecker {
    owner: ThreadId,
}

impl ThreadChecker {
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Debug builds panic off the owning thread; release builds log and
    /// return `WrongThread`.
    pub fn check(&self, operation: &str) -> Result<(), CameraError> {
        record_invariant(CAMERA_THREAD_CONFINEMENT);
        if self.is_current() {
            return Ok(());
        }

        if cfg!(debug_assertions) {
            assert_invariant!(false, CAMERA_THREAD_CONFINEMENT, operation);
        }
        log::error!(
            "{} called from {:?}, expected {:?}",
            operation,
            thread::current().id(),
            self.owner
        );
        Err(CameraError::WrongThread(operation.to_string()))
    }
}

/// Everything needed to build a session on the camera thread.
pub struct CreateSession {
    pub id: SessionId,
    pub request: SessionRequest,
    pub options: SessionOptions,
    pub texture_helper: Box<dyn SurfaceTextureHelper>,
    pub events: Arc<dyn CameraEvents>,
    pub callback: Box<dyn CreateSessionCallback>,
}

pub enum CameraCommand {
    Create(Box<CreateSession>),
    Event {
        session: SessionId,
        event: CameraEvent,
    },
    Stop {
        session: SessionId,
        done: oneshot::Sender<Option<SessionStats>>,
    },
    SetFlash {
        session: SessionId,
        enabled: bool,
        reply: oneshot::Sender<Result<FlashOutcome, CameraError>>,
    },
    CaptureStill {
        session: SessionId,
        options: StillCaptureOptions,
        reply: oneshot::Sender<Result<StillImage, CameraError>>,
    },
    Shutdown,
}

impl fmt::Debug for CameraCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CameraCommand::Create(create) => write!(f, "Create({})", create.id),
            CameraCommand::Event { session, event } => write!(f, "Event({}, {:?})", session, event),
            CameraCommand::Stop { session, .. } => write!(f, "Stop({})", session),
            CameraCommand::SetFlash {
                session, enabled, ..
            } => write!(f, "SetFlash({}, {})", session, enabled),
            CameraCommand::CaptureStill { session, .. } => write!(f, "CaptureStill({})", session),
            CameraCommand::Shutdown => write!(f, "Shutdown"),
        }
    }
}

pub struct CameraThread {
    name: String,
    tx: Sender<CameraCommand>,
    handle: Option<JoinHandle<()>>,
}

impl CameraThread {
    pub fn spawn(name: &str, manager: Arc<dyn CameraManager>) -> Result<Self, CameraError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let loop_tx = tx.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_loop(rx, loop_tx, manager))
            .map_err(|e| {
                CameraError::ThreadUnavailable(format!("failed to spawn {}: {}", name, e))
            })?;

        log::info!("Camera thread {} started", name);
        Ok(Self {
            name: name.to_string(),
            tx,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sender(&self) -> Sender<CameraCommand> {
        self.tx.clone()
    }

    /// Queues creation of a session. The outcome goes to `callback`; the
    /// handle can stop the session at any point, including before it fires.
    pub fn create_session(
        &self,
        request: SessionRequest,
        options: SessionOptions,
        texture_helper: Box<dyn SurfaceTextureHelper>,
        events: Arc<dyn CameraEvents>,
        callback: Box<dyn CreateSessionCallback>,
    ) -> Result<SessionHandle, CameraError> {
        let id = SessionId::new();
        self.tx
            .send(CameraCommand::Create(Box::new(CreateSession {
                id,
                request,
                options,
                texture_helper,
                events,
                callback,
            })))
            .map_err(|_| CameraError::ThreadUnavailable(format!("{} has exited", self.name)))?;
        Ok(SessionHandle::new(id, self.tx.clone()))
    }

    /// Creates a session and waits for it to reach `Running`.
    pub async fn open_session(
        &self,
        request: SessionRequest,
        options: SessionOptions,
        texture_helper: Box<dyn SurfaceTextureHelper>,
        events: Arc<dyn CameraEvents>,
    ) -> Result<SessionHandle, CameraError> {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let callback = Box::new(move |outcome: CreateOutcome| {
            let _ = outcome_tx.send(outcome);
        });
        let handle = self.create_session(request, options, texture_helper, events, callback)?;

        match outcome_rx.await {
            Ok(CreateOutcome::Done(_)) => Ok(handle),
            Ok(CreateOutcome::Failure { kind, message }) => {
                Err(CameraError::from_kind(kind, message))
            }
            Err(_) => Err(CameraError::SessionStopped(
                "session stopped before creation completed".to_string(),
            )),
        }
    }

    /// Stops every session and joins the thread.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.tx.send(CameraCommand::Shutdown).is_err() {
            log::debug!("Camera thread {} already exited", self.name);
        }
        if handle.join().is_err() {
            log::error!("Camera thread {} panicked", self.name);
        }
        log::info!("Camera thread {} stopped", self.name);
    }
}

impl Drop for CameraThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(
    rx: Receiver<CameraCommand>,
    tx: Sender<CameraCommand>,
    manager: Arc<dyn CameraManager>,
) {
    let mut sessions: HashMap<SessionId, Camera2Session> = HashMap::new();

    while let Ok(command) = rx.recv() {
        log::trace!("Camera thread command: {:?}", command);
        match command {
            CameraCommand::Create(create) => {
                let CreateSession {
                    id,
                    request,
                    options,
                    texture_helper,
                    events,
                    callback,
                } = *create;
                let host = SessionHost {
                    manager: Arc::clone(&manager),
                    texture_helper,
                    events,
                    sender: CameraEventSender::new(id, tx.clone()),
                };
                let session = Camera2Session::create(request, options, host, callback);
                sessions.insert(id, session);
            }
            CameraCommand::Event { session, event } => match sessions.get_mut(&session) {
                Some(target) => target.handle_event(event),
                None => discard_event(session, event),
            },
            CameraCommand::Stop { session, done } => {
                let stats = sessions.get_mut(&session).map(|target| {
                    if let Err(e) = target.stop() {
                        log::error!("Stop failed for {}: {}", session, e);
                    }
                    target.stats().clone()
                });
                let _ = done.send(stats);
            }
            CameraCommand::SetFlash {
                session,
                enabled,
                reply,
            } => {
                let outcome = match sessions.get_mut(&session) {
                    Some(target) => target.set_flash(enabled),
                    None => Ok(FlashOutcome::Ignored),
                };
                let _ = reply.send(outcome);
            }
            CameraCommand::CaptureStill {
                session,
                options,
                reply,
            } => match sessions.get_mut(&session) {
                Some(target) => target.capture_still(options, reply),
                None => {
                    let _ = reply.send(Err(CameraError::SessionStopped(format!(
                        "session {} is not active",
                        session
                    ))));
                }
            },
            CameraCommand::Shutdown => {
                for target in sessions.values_mut() {
                    if let Err(e) = target.stop() {
                        log::error!("Stop failed for {}: {}", target.id(), e);
                    }
                }
                break;
            }
        }

        sessions.retain(|_, session| !session.is_finished());
    }

    log::debug!("Camera thread loop exited with {} sessions", sessions.len());
}

/// Completions for a session that no longer exists still own platform
/// handles, which are closed here.
fn discard_event(session: SessionId, event: CameraEvent) {
    match event {
        CameraEvent::Device(DeviceEvent::Opened(mut device)) => {
            log::debug!("Closing device opened for finished session {}", session);
            device.close();
        }
        CameraEvent::Session(CaptureSessionEvent::Configured(mut capture_session)) => {
            log::debug!("Closing capture session for finished session {}", session);
            capture_session.close();
        }
        other => log::trace!("Dropping {:?} for unknown session {}", other, session),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checker_accepts_owner_thread() {
        let checker = ThreadChecker::current();
        assert!(checker.is_current());
        assert!(checker.check("test").is_ok());
    }

    #[test]
    fn test_checker_rejects_other_thread() {
        let checker = ThreadChecker::current();
        let on_other = thread::spawn(move || checker.is_current()).join().unwrap();
        assert!(!on_other);
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_checker_panics_off_thread_in_debug() {
        let checker = ThreadChecker::current();
        let result = thread::spawn(move || checker.check("Camera2Session::stop")).join();
        assert!(result.is_err());
    }
}
