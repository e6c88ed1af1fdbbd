//! Animation effect types and their fixed durations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A transient visual effect played on an actor's avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectType {
    /// Tears and a shake.
    Cry,
    /// Rotating dance.
    Dance,
    /// Screen shake with a boom popover.
    Rage,
    /// Dimmed avatar with a zzz bubble.
    Sleep,
    /// Bounce with confetti.
    Party,
}

impl EffectType {
    /// All effect types, in table order.
    pub const ALL: [EffectType; 5] = [
        EffectType::Cry,
        EffectType::Dance,
        EffectType::Rage,
        EffectType::Sleep,
        EffectType::Party,
    ];

    /// How long the effect plays before it auto-completes.
    pub fn duration(self) -> Duration {
        let millis = match self {
            Self::Cry => 1500,
            Self::Dance => 2000,
            Self::Rage => 1000,
            Self::Sleep => 2000,
            Self::Party => 1500,
        };
        Duration::from_millis(millis)
    }

    /// Returns the lowercase label for this effect.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cry => "cry",
            Self::Dance => "dance",
            Self::Rage => "rage",
            Self::Sleep => "sleep",
            Self::Party => "party",
        }
    }

    /// Maps an event action keyword to the effect it triggers.
    ///
    /// Matching is case-insensitive on the whole action. Actions outside the
    /// keyword table trigger no effect.
    pub fn from_action(action: &str) -> Option<Self> {
        let action = action.trim().to_lowercase();
        match action.as_str() {
            "cry" | "crying" | "sad" | "tear" => Some(Self::Cry),
            "dance" | "dancing" | "groove" | "boogie" => Some(Self::Dance),
            "rage" | "angry" | "mad" | "furious" | "anger" => Some(Self::Rage),
            "sleep" | "sleeping" | "nap" | "tired" | "zzz" => Some(Self::Sleep),
            "party" | "celebrate" | "celebration" | "hooray" | "yay" => Some(Self::Party),
            _ => None,
        }
    }
}

impl std::fmt::Display for EffectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
