//! Inputs consumed by a live session.

use swatchscan_core::DocumentChange;

/// Event fired by the host document.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The selection changed. Carries no payload; the session re-reads it.
    SelectionChanged,
    /// A batch of document edits.
    DocumentChanged(Vec<DocumentChange>),
}

/// Request sent by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run a full scan of the current scope.
    RequestRescan,
    /// Clear the host selection, then scan the whole page.
    ClearScope,
    /// Toggle vector extraction and rescan.
    SetIncludeVectors(bool),
}

/// Anything a session reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Host(HostEvent),
    Command(Command),
}

impl From<HostEvent> for SessionInput {
    fn from(event: HostEvent) -> Self {
        SessionInput::Host(event)
    }
}

impl From<Command> for SessionInput {
    fn from(command: Command) -> Self {
        SessionInput::Command(command)
    }
}
