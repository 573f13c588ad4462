//! The realtime stream hub: fans out newly persisted
//! events to every local subscriber of a stream, and, through a
//! [`Bus`], to subscribers attached to other instances of the service.
//!
//! The hub never re-derives state; it only moves already-persisted
//! [`gridsync_core::PersistedEvent`] values from the point they are
//! appended to the point a subscriber reads them. Its three jobs are:
//!
//! 1. persist-then-broadcast — a write is durable before any
//!    subscriber sees it (never the other way around);
//! 2. bounded delivery with drop-on-overflow — a slow subscriber never
//!    backs up memory for the whole hub, it just loses its place and
//!    is dropped ([`gridsync_core::CoreError::SubscriberBackpressure`]);
//! 3. cross-instance ordering — events arriving out of order over the
//!    [`Bus`] are buffered briefly and released in `seq` order, with a
//!    gap-fill read against the store if the buffer times out.

pub mod bus;
pub mod error;
pub mod hub;
mod reorder;
mod registry;

pub use bus::{Bus, BusError, BusMessage};
pub use error::HubError;
pub use hub::{HubConfig, StreamHub, Subscription};
