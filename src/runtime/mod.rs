// src/runtime/mod.rs

//! Core asynchronous primitives: Messages, Mailboxes, delayed self-sends and
//! table-wide events.

pub mod event_bus;
pub mod mailbox;
pub mod message;
pub mod table_events;
pub mod timer;
pub(crate) mod waitgroup;

pub use event_bus::EventBus;
pub use mailbox::{mailbox, MailboxReceiver, MailboxSender, DEFAULT_MAILBOX_CAPACITY};
pub use message::Message;
pub use table_events::TableEvent;
pub use timer::{DurationRange, SelfTimer};

pub(crate) use waitgroup::WaitGroup;
