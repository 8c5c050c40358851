//! Planner domain: tasks, shopping items, and time blocks.
//!
//! Entities live in file-backed current-state collections; the event log
//! is a derived audit trail, not their source of truth. Every service
//! mutation appends exactly one event from the fixed [`EventKind`]
//! vocabulary through the history recorder.

pub mod error;
pub mod events;
pub mod repository;
pub mod shopping;
pub mod state;
pub mod task;
pub mod timeblock;

pub use error::{DomainError, Result};
pub use events::EventKind;
pub use repository::JsonCollection;
pub use shopping::{ShoppingItem, ShoppingItemUpdate, ShoppingService};
pub use state::PlannerStateProvider;
pub use task::{Task, TaskService, TaskUpdate};
pub use timeblock::{TimeBlock, TimeBlockService, TimeBlockUpdate};
