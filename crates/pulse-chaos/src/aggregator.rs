//! The chaos score and its keyword delta table.

use serde::Serialize;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;
pub const DEFAULT_BASELINE: f64 = 20.0;
pub const DEFAULT_DECAY_AMOUNT: f64 = 0.5;

/// Score delta for an event action. Matching is on the lower-cased action.
pub fn action_delta(action: &str) -> f64 {
    match action.trim().to_lowercase().as_str() {
        "rage" | "angry" | "mad" | "furious" | "anger" | "cry" | "crying" | "sad" | "tear" => 15.0,
        "left" | "frustrated" | "stressed" | "tired" => 8.0,
        "party" | "celebrate" | "celebration" | "hooray" | "yay" | "dance" | "dancing" => -12.0,
        "joined" | "happy" | "excited" | "productive" => -5.0,
        "message" | "meeting" | "break" | "coffee" => -2.0,
        _ => 0.0,
    }
}

/// Display band for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChaosLabel {
    Zen,
    Busy,
    Hectic,
    #[serde(rename = "CHAOS!")]
    Chaos,
}

impl ChaosLabel {
    /// Bands are `[0,25]`, `(25,50]`, `(50,75]`, `(75,100]`.
    pub fn for_score(score: f64) -> Self {
        if score <= 25.0 {
            Self::Zen
        } else if score <= 50.0 {
            Self::Busy
        } else if score <= 75.0 {
            Self::Hectic
        } else {
            Self::Chaos
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zen => "Zen",
            Self::Busy => "Busy",
            Self::Hectic => "Hectic",
            Self::Chaos => "CHAOS!",
        }
    }
}

impl std::fmt::Display for ChaosLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single score in `[0, 100]` that rises with negative activity, falls
/// with positive activity, and decays toward zero when the room is quiet.
#[derive(Debug, Clone, PartialEq)]
pub struct ChaosAggregator {
    baseline: f64,
    score: f64,
}

impl Default for ChaosAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_BASELINE)
    }
}

impl ChaosAggregator {
    pub fn new(baseline: f64) -> Self {
        let baseline = clamp(baseline);
        Self {
            baseline,
            score: baseline,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn label(&self) -> ChaosLabel {
        ChaosLabel::for_score(self.score)
    }

    /// Applies the delta for `action` and returns the new score.
    pub fn apply(&mut self, action: &str) -> f64 {
        self.score = clamp(self.score + action_delta(action));
        self.score
    }

    /// Subtracts `amount`, floored at zero.
    pub fn decay(&mut self, amount: f64) -> f64 {
        self.score = clamp(self.score - amount.max(0.0));
        self.score
    }

    pub fn reset(&mut self) {
        self.score = self.baseline;
    }
}

fn clamp(score: f64) -> f64 {
    if score.is_nan() {
        return MIN_SCORE;
    }
    score.clamp(MIN_SCORE, MAX_SCORE)
}
