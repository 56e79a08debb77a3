// ABOUTME: Registry of workers and workflow definitions plus worker messaging
// ABOUTME: Exports the registry, per-worker mailboxes, and messaging errors

pub mod messaging;
pub mod store;

pub use messaging::{Mailbox, MessagingError};
pub use store::Registry;
