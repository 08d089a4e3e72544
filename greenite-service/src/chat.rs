//! Assistant chat: the serial message queue and the canned responder behind it.

mod queue;
mod responder;

pub use queue::{ChatEvent, MessageQueue};
pub use responder::{Responder, TopicResponder};
