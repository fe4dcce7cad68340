//! The single-threaded dispatch loop tying events, scope and scans together.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use swatchscan_core::{
    DocumentChange, DocumentTree, ScanConfig, ScanContext, SelectionHost, TokenStore,
};
use swatchscan_scan::ScanControl;

use crate::classify::ChangePlan;
use crate::event::{Command, HostEvent, SessionInput};
use crate::orchestrator::{ScanGeneration, ScanOrchestrator, ScanOutcome};
use crate::publish::{Notification, Publisher};
use crate::scope::Scope;
use crate::tracker::ChangeTracker;

/// Advisory published when a scope root is deleted.
pub const SCOPE_DELETED_NOTICE: &str =
    "Scoped element was deleted. Select elements or rescan the page to continue.";

/// Receiving end of a session's input queue.
pub type Inbox = mpsc::UnboundedReceiver<SessionInput>;

enum Wake {
    Input(Option<SessionInput>),
    Deadline,
}

/// Checkpoint hook used while a scan runs inside the session.
///
/// Drains inputs that arrived during the scan into the tracker, and starts a
/// new generation when one of them makes the running scan pointless: a
/// queued command, or a settled selection that moved the scope.
struct CheckpointControl<'a> {
    doc: &'a dyn DocumentTree,
    inbox: Option<&'a mut Inbox>,
    tracker: &'a mut ChangeTracker,
    deferred: &'a mut VecDeque<SessionInput>,
    generation: ScanGeneration,
}

impl ScanControl for CheckpointControl<'_> {
    fn is_cancelled(&mut self) -> bool {
        let now = Instant::now();
        if let Some(inbox) = self.inbox.as_deref_mut() {
            while let Ok(input) = inbox.try_recv() {
                match input {
                    SessionInput::Host(HostEvent::SelectionChanged) => {
                        self.tracker.on_selection_changed(now)
                    }
                    SessionInput::Host(HostEvent::DocumentChanged(batch)) => {
                        self.tracker.on_document_changed(batch, now)
                    }
                    command @ SessionInput::Command(_) => self.deferred.push_back(command),
                }
            }
        }

        let mut supersede = !self.deferred.is_empty();
        if self.tracker.selection_due(now) {
            let (scope, _) = ChangeTracker::observed_scope(self.doc);
            if &scope != self.tracker.scope() {
                self.deferred.push_back(HostEvent::SelectionChanged.into());
                supersede = true;
            }
            self.tracker.take_selection(now);
        }

        if supersede {
            let generation = self.generation.advance();
            debug!(generation, "Superseding running scan");
        }
        false
    }
}

/// A live color inventory over one document.
///
/// Inputs are handled strictly one at a time. Debounced work runs from
/// [`poll`](Self::poll) once its quiet period has passed, or from
/// [`flush`](Self::flush) on demand.
pub struct LiveSession<D, P> {
    doc: D,
    publisher: P,
    orchestrator: ScanOrchestrator,
    tracker: ChangeTracker,
    deferred: VecDeque<SessionInput>,
}

impl<D, P> LiveSession<D, P>
where
    D: DocumentTree + TokenStore + SelectionHost,
    P: Publisher,
{
    pub fn new(doc: D, publisher: P, config: ScanConfig) -> Self {
        Self {
            tracker: ChangeTracker::new(&config),
            orchestrator: ScanOrchestrator::new(config),
            doc,
            publisher,
            deferred: VecDeque::new(),
        }
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    pub fn orchestrator(&self) -> &ScanOrchestrator {
        &self.orchestrator
    }

    pub fn scope(&self) -> &Scope {
        self.tracker.scope()
    }

    pub fn into_parts(self) -> (D, P) {
        (self.doc, self.publisher)
    }

    /// Scan the current scope for the first time.
    pub fn start(&mut self) {
        debug!("Starting live session");
        self.full_scan(None);
    }

    /// React to one input.
    pub fn handle(&mut self, input: impl Into<SessionInput>) {
        self.dispatch(input.into(), None);
        self.drain_deferred(None);
    }

    /// Run whatever debounced work is due.
    pub fn poll(&mut self) {
        self.poll_at(Instant::now(), None);
    }

    /// Run all debounced work now, regardless of deadlines.
    pub fn flush(&mut self) {
        if self.tracker.flush_selection() {
            self.selection_settled(None);
        }
        if let Some(batch) = self.tracker.flush_changes() {
            self.changes_settled(batch, None);
        }
        self.drain_deferred(None);
    }

    /// Earliest instant at which [`poll`](Self::poll) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tracker.next_deadline()
    }

    /// Drive the session from an input channel until it closes.
    pub async fn run(mut self, mut inbox: Inbox) -> (D, P) {
        self.full_scan(Some(&mut inbox));

        loop {
            self.drain_deferred(Some(&mut inbox));

            let deadline = self.next_deadline();
            let wake = tokio::select! {
                input = inbox.recv() => Wake::Input(input),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    Wake::Deadline
                }
            };

            match wake {
                Wake::Input(Some(input)) => self.dispatch(input, Some(&mut inbox)),
                Wake::Input(None) => break,
                Wake::Deadline => self.poll_at(Instant::now(), Some(&mut inbox)),
            }
        }

        debug!("Input channel closed, stopping live session");
        self.into_parts()
    }

    fn dispatch(&mut self, input: SessionInput, inbox: Option<&mut Inbox>) {
        let now = Instant::now();
        match input {
            SessionInput::Host(HostEvent::SelectionChanged) => {
                self.tracker.on_selection_changed(now)
            }
            SessionInput::Host(HostEvent::DocumentChanged(batch)) => {
                self.tracker.on_document_changed(batch, now)
            }
            SessionInput::Command(command) => self.command(command, inbox),
        }
    }

    fn poll_at(&mut self, now: Instant, mut inbox: Option<&mut Inbox>) {
        if self.tracker.take_selection(now) {
            self.selection_settled(inbox.as_deref_mut());
        }
        if let Some(batch) = self.tracker.take_changes(now) {
            self.changes_settled(batch, inbox.as_deref_mut());
        }
        self.drain_deferred(inbox);
    }

    fn drain_deferred(&mut self, mut inbox: Option<&mut Inbox>) {
        while let Some(input) = self.deferred.pop_front() {
            match input {
                // Already debounced when it was deferred.
                SessionInput::Host(HostEvent::SelectionChanged) => {
                    self.selection_settled(inbox.as_deref_mut())
                }
                other => self.dispatch(other, inbox.as_deref_mut()),
            }
        }
    }

    fn command(&mut self, command: Command, inbox: Option<&mut Inbox>) {
        debug!(?command, "Handling command");
        match command {
            Command::RequestRescan => {}
            Command::ClearScope => {
                if let Err(err) = self.doc.clear_selection() {
                    warn!(error = %err, "Failed to clear selection");
                }
            }
            Command::SetIncludeVectors(include_vectors) => {
                self.orchestrator
                    .scanner_mut()
                    .set_include_vectors(include_vectors);
            }
        }
        self.full_scan(inbox);
    }

    fn selection_settled(&mut self, inbox: Option<&mut Inbox>) {
        let (scope, context) = ChangeTracker::observed_scope(&self.doc);
        if !self.update_scope(scope, &context) {
            debug!("Selection settled on the current scope");
            return;
        }
        if !self.tracker.scope().is_empty() {
            self.full_scan(inbox);
        }
    }

    fn changes_settled(&mut self, batch: Vec<DocumentChange>, inbox: Option<&mut Inbox>) {
        let plan = self
            .tracker
            .classify(&batch, self.orchestrator.inventory(), &self.doc);

        match plan {
            ChangePlan::Ignore => {}
            ChangePlan::ScopeInvalidated => self.invalidate_scope(),
            ChangePlan::FullRescan => self.full_scan(inbox),
            ChangePlan::Incremental(ids) => {
                let mut control = CheckpointControl {
                    doc: &self.doc,
                    inbox,
                    tracker: &mut self.tracker,
                    deferred: &mut self.deferred,
                    generation: self.orchestrator.generation(),
                };
                let outcome = self.orchestrator.incremental_update(
                    &self.doc,
                    &self.doc,
                    &ids,
                    &mut control,
                    &mut self.publisher,
                );
                if outcome == ScanOutcome::Published {
                    self.sync_scope_with_inventory();
                }
            }
        }
    }

    fn invalidate_scope(&mut self) {
        info!("Scoped element deleted, clearing scope");
        if let Err(err) = self.doc.clear_selection() {
            warn!(error = %err, "Failed to clear selection");
        }
        self.orchestrator.clear(&mut self.publisher);
        self.update_scope(Scope::NoScope, &ScanContext::page());
        self.publisher.publish(Notification::Notice {
            message: SCOPE_DELETED_NOTICE.to_string(),
        });
    }

    fn full_scan(&mut self, inbox: Option<&mut Inbox>) {
        let mut control = CheckpointControl {
            doc: &self.doc,
            inbox,
            tracker: &mut self.tracker,
            deferred: &mut self.deferred,
            generation: self.orchestrator.generation(),
        };
        let outcome =
            self.orchestrator
                .full_scan(&self.doc, &self.doc, &mut control, &mut self.publisher);
        if outcome == ScanOutcome::Published {
            self.sync_scope_with_inventory();
        }
    }

    /// Follow the scope of the inventory just published.
    fn sync_scope_with_inventory(&mut self) {
        let context = self.orchestrator.context().clone();
        self.update_scope(Scope::from_context(&context), &context);
    }

    fn update_scope(&mut self, scope: Scope, context: &ScanContext) -> bool {
        if !self.tracker.set_scope(scope) {
            return false;
        }
        self.publisher.publish(Notification::ScopeChanged {
            context: context.clone(),
        });
        true
    }
}
