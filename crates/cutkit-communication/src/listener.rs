//! Listener callbacks, delivered off the executor thread.
//!
//! The executor never calls a listener directly. Events go through an
//! `mpsc` channel to a dispatcher thread, so a slow listener cannot stall
//! the command stream.

use crate::executor::{ExecutionReport, ExecutionSnapshot};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

/// Observer of a document run.
pub trait ExecutionListener: Send + 'static {
    /// Periodic progress snapshot.
    fn update_gui(&self, snapshot: &ExecutionSnapshot);

    /// A run failed.
    fn error(&self, message: &str);

    /// A run ended, successfully or not.
    fn execution_finished(&self, report: &ExecutionReport);
}

#[derive(Debug)]
enum ListenerEvent {
    Update(ExecutionSnapshot),
    Error(String),
    Finished(ExecutionReport),
}

/// Owns the dispatcher thread. Dropping it flushes pending events.
#[derive(Debug)]
pub struct ListenerDispatcher {
    tx: Option<Sender<ListenerEvent>>,
    handle: Option<JoinHandle<()>>,
}

impl ListenerDispatcher {
    pub fn spawn(listener: impl ExecutionListener) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<ListenerEvent>();
        let handle = thread::Builder::new()
            .name("cutkit-listener".into())
            .spawn(move || {
                while let Ok(event) = rx.recv() {
                    match event {
                        ListenerEvent::Update(snapshot) => listener.update_gui(&snapshot),
                        ListenerEvent::Error(message) => listener.error(&message),
                        ListenerEvent::Finished(report) => listener.execution_finished(&report),
                    }
                }
            })?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn update_gui(&self, snapshot: ExecutionSnapshot) {
        self.send(ListenerEvent::Update(snapshot));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(ListenerEvent::Error(message.into()));
    }

    pub fn finished(&self, report: ExecutionReport) {
        self.send(ListenerEvent::Finished(report));
    }

    fn send(&self, event: ListenerEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::warn!("Listener thread is gone, event dropped");
            }
        }
    }
}

impl Drop for ListenerDispatcher {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Listener thread panicked");
            }
        }
    }
}
