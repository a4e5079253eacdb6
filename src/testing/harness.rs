//! Drives a [`Camera2Session`] on the calling thread without a camera
//! thread, pumping the event queue by hand.

use crate::session::backend::{CameraEvent, CameraEventSender};
use crate::session::camera2::{Camera2Session, SessionHost, SessionOptions, SessionRequest};
use crate::session::events::{
    CameraEvents, CreateOutcome, CreateSessionCallback, SessionNotification,
};
use crate::session::frame::VideoFrame;
use crate::session::state::SessionId;
use crate::session::thread::CameraCommand;
use crate::testing::fake_backend::{FakeBackend, FakeBehavior};
use crossbeam_channel::{Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Records every notification in arrival order.
#[derive(Default)]
pub struct RecordingEvents {
    notifications: Mutex<Vec<SessionNotification>>,
}

impl RecordingEvents {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, notification: SessionNotification) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(notification);
        }
    }

    pub fn notifications(&self) -> Vec<SessionNotification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                SessionNotification::Error(_, message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn frames(&self) -> Vec<VideoFrame> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                SessionNotification::Frame(_, frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&SessionNotification) -> bool) -> usize {
        self.notifications().iter().filter(|n| matches(n)).count()
    }
}

impl CameraEvents for RecordingEvents {
    fn on_camera_opening(&self) {
        self.push(SessionNotification::Opening);
    }

    fn on_camera_error(&self, session: SessionId, message: &str) {
        self.push(SessionNotification::Error(session, message.to_string()));
    }

    fn on_camera_disconnected(&self, session: SessionId) {
        self.push(SessionNotification::Disconnected(session));
    }

    fn on_camera_closed(&self, session: SessionId) {
        self.push(SessionNotification::Closed(session));
    }

    fn on_frame_captured(&self, session: SessionId, frame: &VideoFrame) {
        self.push(SessionNotification::Frame(session, frame.clone()));
    }
}

/// Callback that appends each outcome it receives to a shared list.
pub fn outcome_recorder() -> (Box<dyn CreateSessionCallback>, Arc<Mutex<Vec<CreateOutcome>>>) {
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    let callback = Box::new(move |outcome: CreateOutcome| {
        if let Ok(mut outcomes) = sink.lock() {
            outcomes.push(outcome);
        }
    });
    (callback, outcomes)
}

pub struct SessionHarness {
    pub backend: FakeBackend,
    pub events: Arc<RecordingEvents>,
    pub outcomes: Arc<Mutex<Vec<CreateOutcome>>>,
    pub session: Camera2Session,
    tx: Sender<CameraCommand>,
    rx: Receiver<CameraCommand>,
}

impl SessionHarness {
    pub fn start(behavior: FakeBehavior, request: SessionRequest) -> Self {
        Self::start_with_options(behavior, request, SessionOptions::default())
    }

    /// Creates the session; nothing posted by the backend is handled until
    /// [`SessionHarness::pump`].
    pub fn start_with_options(
        behavior: FakeBehavior,
        request: SessionRequest,
        options: SessionOptions,
    ) -> Self {
        let backend = FakeBackend::new(behavior);
        let events = RecordingEvents::new();
        let (callback, outcomes) = outcome_recorder();
        let (tx, rx) = crossbeam_channel::unbounded();

        let host = SessionHost {
            manager: backend.manager(),
            texture_helper: backend.texture_helper(),
            events: events.clone(),
            sender: CameraEventSender::new(SessionId::new(), tx.clone()),
        };
        let session = Camera2Session::create(request, options, host, callback);

        Self {
            backend,
            events,
            outcomes,
            session,
            tx,
            rx,
        }
    }

    /// Handles queued events until the queue is empty. Returns how many
    /// were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(command) = self.rx.try_recv() {
            if let CameraCommand::Event { session, event } = command {
                if session == self.session.id() {
                    self.session.handle_event(event);
                    handled += 1;
                }
            }
        }
        handled
    }

    /// Queues an event as if the platform had posted it.
    pub fn post(&self, event: CameraEvent) {
        let sender = CameraEventSender::new(self.session.id(), self.tx.clone());
        sender.send(event);
    }

    pub fn outcomes(&self) -> Vec<CreateOutcome> {
        self.outcomes
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }
}
