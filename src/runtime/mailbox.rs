// src/runtime/mailbox.rs

//! Type aliases for philosopher mailboxes based on `async-channel`.

use crate::runtime::message::Message;

/// The sending end of a philosopher's mailbox.
/// Cloneable: both neighbours and the philosopher's own timers hold one.
pub type MailboxSender = async_channel::Sender<Message>;

/// The receiving end of a philosopher's mailbox.
/// Owned by exactly one processing loop so messages are handled sequentially.
pub type MailboxReceiver = async_channel::Receiver<Message>;

/// Default capacity for bounded mailboxes.
/// Each philosopher has at most a handful of messages in flight towards a
/// neighbour (one grant and one request per shared fork, plus its own timer),
/// so a small bound never stalls the ring.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Creates a new bounded mailbox channel pair. Capacity is at least 1.
pub fn mailbox(capacity: usize) -> (MailboxSender, MailboxReceiver) {
  async_channel::bounded(capacity.max(1))
}
