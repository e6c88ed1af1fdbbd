//! Per-actor media overlays (GIF popovers attached to an avatar).

use serde::Serialize;
use uuid::Uuid;

/// Most overlays shown on one avatar at once.
pub const MAX_OVERLAYS_PER_ACTOR: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaOverlay {
    pub id: Uuid,
    pub url: String,
    pub added_at: i64,
    /// 0 is the top of the stack.
    pub stack_position: usize,
}

/// Newest-first stack of overlays for one actor.
///
/// Pushing past capacity evicts the oldest entry. Positions are renumbered
/// from 0 after every change.
#[derive(Debug, Clone)]
pub struct MediaOverlayStack {
    capacity: usize,
    overlays: Vec<MediaOverlay>,
}

impl Default for MediaOverlayStack {
    fn default() -> Self {
        Self::new(MAX_OVERLAYS_PER_ACTOR)
    }
}

impl MediaOverlayStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            overlays: Vec::new(),
        }
    }

    pub fn push(&mut self, url: &str, now_ms: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.overlays.insert(
            0,
            MediaOverlay {
                id,
                url: url.to_string(),
                added_at: now_ms,
                stack_position: 0,
            },
        );
        self.overlays.truncate(self.capacity);
        self.renumber();
        id
    }

    /// Removes one overlay. Returns `false` if the id is unknown.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.overlays.len();
        self.overlays.retain(|overlay| overlay.id != id);
        if self.overlays.len() == before {
            return false;
        }
        self.renumber();
        true
    }

    pub fn clear(&mut self) {
        self.overlays.clear();
    }

    pub fn list(&self) -> &[MediaOverlay] {
        &self.overlays
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    fn renumber(&mut self) {
        for (position, overlay) in self.overlays.iter_mut().enumerate() {
            overlay.stack_position = position;
        }
    }
}
