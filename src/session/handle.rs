use crate::errors::CameraError;
use crate::session::backend::{StillCaptureOptions, StillImage};
use crate::session::camera2::FlashOutcome;
use crate::session::state::SessionId;
use crate::session::thread::CameraCommand;
use crate::timing::SessionStats;
use crossbeam_channel::Sender;
use tokio::sync::oneshot;

/// Caller-side handle to a session living on the camera thread. Each call
/// posts a command; nothing here touches session state directly.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    tx: Sender<CameraCommand>,
}

fn thread_gone() -> CameraError {
    CameraError::ThreadUnavailable("camera thread has exited".to_string())
}

impl SessionHandle {
    pub(crate) fn new(id: SessionId, tx: Sender<CameraCommand>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    fn post(&self, command: CameraCommand) -> Result<(), CameraError> {
        self.tx.send(command).map_err(|_| thread_gone())
    }

    /// Stops the session and returns its final stats, or `None` if it had
    /// already finished and been dropped.
    pub async fn stop(&self) -> Result<Option<SessionStats>, CameraError> {
        let (done, rx) = oneshot::channel();
        self.post(CameraCommand::Stop {
            session: self.id,
            done,
        })?;
        rx.await.map_err(|_| thread_gone())
    }

    /// Blocking variant of [`SessionHandle::stop`] for synchronous callers.
    /// Must not be called from inside an async runtime.
    pub fn stop_blocking(&self) -> Result<Option<SessionStats>, CameraError> {
        let (done, rx) = oneshot::channel();
        self.post(CameraCommand::Stop {
            session: self.id,
            done,
        })?;
        rx.blocking_recv().map_err(|_| thread_gone())
    }

    /// Queues a stop without waiting for it.
    pub fn request_stop(&self) -> Result<(), CameraError> {
        let (done, _rx) = oneshot::channel();
        self.post(CameraCommand::Stop {
            session: self.id,
            done,
        })
    }

    pub async fn set_flash(&self, enabled: bool) -> Result<FlashOutcome, CameraError> {
        let (reply, rx) = oneshot::channel();
        self.post(CameraCommand::SetFlash {
            session: self.id,
            enabled,
            reply,
        })?;
        rx.await.map_err(|_| thread_gone())?
    }

    pub async fn capture_still(
        &self,
        options: StillCaptureOptions,
    ) -> Result<StillImage, CameraError> {
        let (reply, rx) = oneshot::channel();
        self.post(CameraCommand::CaptureStill {
            session: self.id,
            options,
            reply,
        })?;
        rx.await.map_err(|_| thread_gone())?
    }
}
