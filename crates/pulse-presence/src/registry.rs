//! The presence registry: known actors and their rendering slots.

use crate::hash::{color_index, initials, preferred_slot};
use pulse_types::{PresenceStatus, COLOR_CLASS_COUNT, DEFAULT_SLOT_COUNT};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Default inactivity after which an actor is shown as away.
pub const DEFAULT_AWAY_AFTER: Duration = Duration::from_secs(5 * 60);

/// Registry sizing and aging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Number of rendering slots.
    pub slot_count: usize,
    /// Idle time after which an actor is demoted to away.
    pub away_after: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            away_after: DEFAULT_AWAY_AFTER,
        }
    }
}

/// A registered actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceActor {
    pub actor_id: String,
    pub display_name: String,
    pub initials: String,
    /// Fixed for the actor's lifetime in the registry.
    pub color_index: usize,
    /// Fixed for the actor's lifetime in the registry.
    pub slot: usize,
    /// Milliseconds since the Unix epoch.
    pub last_activity_at: i64,
    pub status: PresenceStatus,
}

/// Known actors and the slot-occupancy set.
///
/// The registry is the only owner of slot occupancy. All mutation goes
/// through `&mut self`; shared use across tasks wraps it in a single mutex
/// (see [`crate::PresenceService`]).
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    config: RegistryConfig,
    actors: HashMap<String, PresenceActor>,
    occupied: HashSet<usize>,
}

impl PresenceRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config: RegistryConfig {
                slot_count: config.slot_count.max(1),
                ..config
            },
            actors: HashMap::new(),
            occupied: HashSet::new(),
        }
    }

    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    /// Registers an unseen actor or refreshes a known one.
    ///
    /// A known actor gets its display name, initials, activity time and
    /// status updated; its slot and color never change.
    pub fn upsert(&mut self, actor_id: &str, display_name: &str, now_ms: i64) -> PresenceActor {
        if let Some(actor) = self.actors.get_mut(actor_id) {
            if actor.display_name != display_name {
                actor.display_name = display_name.to_string();
                actor.initials = initials(display_name);
            }
            actor.last_activity_at = now_ms;
            actor.status = PresenceStatus::Online;
            return actor.clone();
        }

        let slot = self.assign_slot(actor_id);
        let actor = PresenceActor {
            actor_id: actor_id.to_string(),
            display_name: display_name.to_string(),
            initials: initials(display_name),
            color_index: color_index(actor_id, COLOR_CLASS_COUNT),
            slot,
            last_activity_at: now_ms,
            status: PresenceStatus::Online,
        };
        tracing::info!(
            actor_id = %actor_id,
            slot,
            color_index = actor.color_index,
            "registered new actor"
        );
        self.actors.insert(actor_id.to_string(), actor.clone());
        actor
    }

    /// Marks a known actor active. Returns `false` for unknown actors.
    pub fn touch(&mut self, actor_id: &str, now_ms: i64) -> bool {
        match self.actors.get_mut(actor_id) {
            Some(actor) => {
                actor.last_activity_at = now_ms;
                actor.status = PresenceStatus::Online;
                true
            }
            None => false,
        }
    }

    /// Demotes actors idle longer than the away threshold.
    ///
    /// Returns the ids of actors that changed to away in this sweep. Slot
    /// occupancy is untouched.
    pub fn sweep(&mut self, now_ms: i64) -> Vec<String> {
        let threshold = i64::try_from(self.config.away_after.as_millis()).unwrap_or(i64::MAX);
        let mut demoted = Vec::new();
        for actor in self.actors.values_mut() {
            if actor.status == PresenceStatus::Online
                && now_ms.saturating_sub(actor.last_activity_at) > threshold
            {
                actor.status = PresenceStatus::Away;
                demoted.push(actor.actor_id.clone());
            }
        }
        demoted.sort();
        demoted
    }

    /// Removes every actor and frees every slot.
    pub fn reset(&mut self) {
        self.actors.clear();
        self.occupied.clear();
    }

    pub fn get(&self, actor_id: &str) -> Option<&PresenceActor> {
        self.actors.get(actor_id)
    }

    /// All actors ordered by slot ascending (actor id breaks collision ties).
    pub fn list(&self) -> Vec<PresenceActor> {
        let mut actors: Vec<_> = self.actors.values().cloned().collect();
        actors.sort_by(|a, b| a.slot.cmp(&b.slot).then_with(|| a.actor_id.cmp(&b.actor_id)));
        actors
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Number of distinct occupied slots.
    pub fn occupied_slots(&self) -> usize {
        self.occupied.len()
    }

    fn assign_slot(&mut self, actor_id: &str) -> usize {
        let n = self.config.slot_count;
        let preferred = preferred_slot(actor_id, n);
        let slot = self.nearest_free(preferred).unwrap_or_else(|| {
            tracing::warn!(
                actor_id = %actor_id,
                slot = preferred,
                slot_count = n,
                "all slots occupied; sharing preferred slot"
            );
            preferred
        });
        self.occupied.insert(slot);
        slot
    }

    /// Probes outward from `preferred`, trying `+offset` before `-offset`.
    fn nearest_free(&self, preferred: usize) -> Option<usize> {
        let n = self.config.slot_count;
        if !self.occupied.contains(&preferred) {
            return Some(preferred);
        }
        (1..=n / 2).find_map(|offset| {
            let up = (preferred + offset) % n;
            let down = (preferred + n - offset) % n;
            [up, down].into_iter().find(|slot| !self.occupied.contains(slot))
        })
    }
}
