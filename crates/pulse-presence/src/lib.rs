//! Presence registry for the officepulse pipeline.
//!
//! Tracks every actor seen on the activity stream and gives each one a
//! stable rendering slot and color. Placement is a pure function of the
//! actor id, resolved against the set of occupied slots:
//!
//! 1. the preferred slot is `hash31(actor_id) mod N`;
//! 2. if taken, offsets `+1, -1, +2, -2, …` are probed and the first free
//!    slot wins (positive offset first on ties);
//! 3. if every slot is taken, the actor shares its preferred slot.
//!
//! Once assigned, an actor's slot and color never change until the
//! registry is reset. Actors idle for more than five minutes are shown as
//! away by a periodic sweep.

mod hash;
mod registry;
mod service;

pub use hash::{color_index, initials, preferred_slot};
pub use registry::{PresenceActor, PresenceRegistry, RegistryConfig, DEFAULT_AWAY_AFTER};
pub use service::{PresenceService, DEFAULT_SWEEP_INTERVAL};
