use rand::Rng;
use uuid::Uuid;

use crate::models::COLOR_PALETTE;

/// Generate a fresh opaque user ID
pub fn generate_user_id() -> String {
    Uuid::new_v4().to_string()
}

/// Pick a display color at random from the fixed palette
pub fn pick_color() -> &'static str {
    let index = rand::rng().random_range(0..COLOR_PALETTE.len());
    COLOR_PALETTE[index]
}
