use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyModifiers};

/// Events consumed by the plot viewer loop
#[derive(Clone, Debug)]
pub enum ViewerEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

impl ViewerEvent {
    /// Esc, `q`, or ctrl+c
    pub fn is_quit(&self) -> bool {
        match self {
            ViewerEvent::Key(key) => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => true,
                KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Source of terminal events
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<ViewerEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<ViewerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) => tx.send(ViewerEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => tx.send(ViewerEvent::Resize),
                Ok(_) => Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, "terminal event read failed");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<ViewerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-fed source for tests
pub struct TestEventSource {
    rx: Receiver<ViewerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<ViewerEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<ViewerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the viewer one event at a time, yielding `Tick` when idle
pub struct Runner<E: EventSource> {
    event_source: E,
    tick: Duration,
}

impl<E: EventSource> Runner<E> {
    pub fn new(event_source: E, tick: Duration) -> Self {
        Self { event_source, tick }
    }

    pub fn step(&self) -> ViewerEvent {
        match self.event_source.recv_timeout(self.tick) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                ViewerEvent::Tick
            }
        }
    }
}
