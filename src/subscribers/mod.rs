//! # Event subscribers.
//!
//! Subscribers receive the events published on the [`Bus`](crate::events::Bus)
//! through a [`SubscriberSet`]: one bounded queue and one worker task each.
//!
//! ```text
//! Coordinator ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                            ├──► LogWriter
//!                                                            └──► custom Subscribe impls
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
