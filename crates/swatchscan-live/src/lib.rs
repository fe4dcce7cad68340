//! Live change tracking and scan orchestration for swatchscan.
//!
//! A [`LiveSession`] keeps a color inventory current while the document is
//! edited:
//!
//! - **Debouncing** of selection changes and document-change batches
//! - **Classification** of each settled batch as ignorable, incremental, a
//!   full rescan, or a scope invalidation
//! - **Generations**: starting a scan supersedes every scan still running,
//!   and a superseded scan never publishes
//! - **Notifications** to the presentation layer through a [`Publisher`]
//!
//! # Example
//!
//! ```rust,no_run
//! use swatchscan_core::{MemoryDocument, ScanConfig, SharedDocument};
//! use swatchscan_live::{HostEvent, LiveSession, Notification};
//!
//! let doc = SharedDocument::new(MemoryDocument::load("page.json").unwrap());
//! let mut session =
//!     LiveSession::new(doc.clone(), Vec::<Notification>::new(), ScanConfig::default());
//! session.start();
//!
//! let change = doc.edit(|doc| doc.rename(&"1:2".into(), "Primary")).unwrap();
//! session.handle(HostEvent::DocumentChanged(vec![change]));
//! session.flush();
//! ```

mod classify;
mod debounce;
mod event;
mod orchestrator;
mod publish;
mod scope;
mod session;
mod tracker;

pub use classify::{ChangePlan, classify};
pub use debounce::Debouncer;
pub use event::{Command, HostEvent, SessionInput};
pub use orchestrator::{ScanGeneration, ScanOrchestrator, ScanOutcome};
pub use publish::{Notification, Publisher};
pub use scope::Scope;
pub use session::{Inbox, LiveSession, SCOPE_DELETED_NOTICE};
pub use tracker::ChangeTracker;
