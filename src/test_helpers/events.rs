use std::sync::{Arc, Mutex};

use crate::eeprom::{OperationState, TransferEvent};

/// Records every event an operation reports.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<TransferEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress sink to hand to the engine.
    pub fn sink(&self) -> impl Fn(TransferEvent) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event| events.lock().expect("event log poisoned").push(event)
    }

    pub fn all(&self) -> Vec<TransferEvent> {
        self.events.lock().expect("event log poisoned").clone()
    }

    pub fn states(&self) -> Vec<OperationState> {
        self.all()
            .into_iter()
            .filter_map(|event| match event {
                TransferEvent::State(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn last_state(&self) -> Option<OperationState> {
        self.states().last().copied()
    }

    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.all()
            .into_iter()
            .filter_map(|event| match event {
                TransferEvent::Progress { done, total } => Some((done, total)),
                _ => None,
            })
            .collect()
    }

    pub fn last_progress(&self) -> Option<(usize, usize)> {
        self.progress().last().copied()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter_map(|event| match event {
                TransferEvent::Status { message } => Some(message),
                _ => None,
            })
            .collect()
    }
}
