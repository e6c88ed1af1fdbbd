//! Deterministic actor-id hashing and initials.
//!
//! Both hashes are 32-bit wrapping polynomials over UTF-16 code units with
//! no seed, so the same actor id lands on the same slot and color in every
//! process. The two use different multipliers so a slot collision does not
//! imply a color collision.

const SLOT_MULTIPLIER: i32 = 31;
const COLOR_MULTIPLIER: i32 = 7;

fn polynomial_hash(actor_id: &str, multiplier: i32) -> u32 {
    actor_id
        .encode_utf16()
        .fold(0i32, |h, unit| {
            h.wrapping_mul(multiplier).wrapping_add(i32::from(unit))
        })
        .unsigned_abs()
}

/// Preferred rendering slot for an actor, in `0..slot_count`.
pub fn preferred_slot(actor_id: &str, slot_count: usize) -> usize {
    polynomial_hash(actor_id, SLOT_MULTIPLIER) as usize % slot_count.max(1)
}

/// Color class for an actor, in `0..color_count`.
pub fn color_index(actor_id: &str, color_count: usize) -> usize {
    polynomial_hash(actor_id, COLOR_MULTIPLIER) as usize % color_count.max(1)
}

/// First character of each of the first two whitespace-separated tokens,
/// upper-cased. A character whose upper case expands (`ß` to `SS`) keeps
/// only the first upper-case character, so each token contributes one.
pub fn initials(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .filter_map(|c| c.to_uppercase().next())
        .collect()
}
