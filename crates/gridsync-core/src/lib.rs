//! Domain types and pure abstractions shared by every GridSync crate.
//!
//! This crate performs no I/O. It defines the closed event-type
//! taxonomy, the append-only event store contract, the pure projection
//! (fold) logic that turns an ordered event list into game/room state,
//! and the puzzle/solve-record domain types. Concrete backends
//! (`gridsync-store-postgres`, `gridsync-bus-redis`) and the realtime
//! fan-out layer (`gridsync-hub`) depend on this crate, never the
//! other way around.

pub mod error;
pub mod event;
pub mod projection;
pub mod puzzle;
pub mod store;

#[cfg(feature = "testing")]
pub mod testing;

pub use error::CoreError;
pub use event::{EventDraft, EventPayload, PersistedEvent, Seq, StreamKind};
pub use projection::{project_game, project_room, GameState, Projection, RoomState};
pub use store::EventStore;
