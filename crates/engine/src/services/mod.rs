//! Collaborators the engine consumes.

pub mod notifications;
pub mod parties;

pub use notifications::{
    InMemoryNotificationEmitter, Notification, NotificationEmitter, NotificationKind,
    TracingNotificationEmitter,
};
pub use parties::{InMemoryPartyDirectory, PartyDirectory};
