//! Outbound notifications: creation outcome and ongoing session events.

use crate::errors::ErrorKind;
use crate::session::frame::VideoFrame;
use crate::session::state::SessionId;
use crossbeam_channel::Sender;

/// Receives the creation outcome. Both methods consume the callback, so at
/// most one of them can ever run.
pub trait CreateSessionCallback: Send {
    fn on_done(self: Box<Self>, session: SessionId);
    fn on_failure(self: Box<Self>, kind: ErrorKind, message: String);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Done(SessionId),
    Failure { kind: ErrorKind, message: String },
}

impl<F> CreateSessionCallback for F
where
    F: FnOnce(CreateOutcome) + Send,
{
    fn on_done(self: Box<Self>, session: SessionId) {
        (*self)(CreateOutcome::Done(session))
    }

    fn on_failure(self: Box<Self>, kind: ErrorKind, message: String) {
        (*self)(CreateOutcome::Failure { kind, message })
    }
}

/// Event sink for a session. Frames are lent for the duration of the call;
/// a sink that keeps one must clone it.
pub trait CameraEvents: Send + Sync {
    fn on_camera_opening(&self);
    fn on_camera_error(&self, session: SessionId, message: &str);
    fn on_camera_disconnected(&self, session: SessionId);
    fn on_camera_closed(&self, session: SessionId);
    fn on_frame_captured(&self, session: SessionId, frame: &VideoFrame);
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotification {
    Opening,
    Error(SessionId, String),
    Disconnected(SessionId),
    Closed(SessionId),
    Frame(SessionId, VideoFrame),
}

/// Forwards every event onto a channel.
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    tx: Sender<SessionNotification>,
}

impl ChannelEvents {
    pub fn new(tx: Sender<SessionNotification>) -> Self {
        Self { tx }
    }

    fn forward(&self, notification: SessionNotification) {
        if self.tx.send(notification).is_err() {
            log::debug!("Notification receiver dropped");
        }
    }
}

impl CameraEvents for ChannelEvents {
    fn on_camera_opening(&self) {
        self.forward(SessionNotification::Opening);
    }

    fn on_camera_error(&self, session: SessionId, message: &str) {
        self.forward(SessionNotification::Error(session, message.to_string()));
    }

    fn on_camera_disconnected(&self, session: SessionId) {
        self.forward(SessionNotification::Disconnected(session));
    }

    fn on_camera_closed(&self, session: SessionId) {
        self.forward(SessionNotification::Closed(session));
    }

    fn on_frame_captured(&self, session: SessionId, frame: &VideoFrame) {
        self.forward(SessionNotification::Frame(session, frame.clone()));
    }
}
