//! Broadcast scheduling module.
//!
//! Runs broadcast rounds over every bot and target, pacing sends per chat
//! kind, once or on a fixed interval.

mod delay;
mod round;
mod runner;
mod state;

pub use delay::{ChatKind, DelayPolicy};
pub use round::Broadcaster;
pub use runner::{BroadcastScheduler, RunMode};
pub use state::{CredentialReport, RoundReport};
