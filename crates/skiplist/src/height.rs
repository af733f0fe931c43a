//! The probabilistic insertion-height draw (§4.4): `P(height >= h) = 2^-h`,
//! capped at [`LAYER_LIMIT`].

use rand::Rng;

/// The highest layer a node may occupy.
pub const LAYER_LIMIT: u8 = 64;

/// Draw a fresh insertion height by flipping a fair coin until it comes up
/// tails, capping at `LAYER_LIMIT`. `P(height >= h) = 2^-h` for `h <=
/// LAYER_LIMIT`, and the draw never exceeds `LAYER_LIMIT` regardless of how
/// the coin lands.
pub fn draw_height(rng: &mut impl Rng) -> u8 {
    let mut height = 0u8;
    while height < LAYER_LIMIT && rng.gen::<bool>() {
        height += 1;
    }
    height
}
