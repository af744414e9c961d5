//! Capturing and restoring the world random stream.

use kaleido_shared::RandomState;
use rand_chacha::ChaCha8Rng;

/// Snapshot of `rng`, exact enough to resume the same sequence.
#[must_use]
pub fn capture(rng: &ChaCha8Rng) -> RandomState {
    RandomState {
        seed: rng.get_seed(),
        stream: rng.get_stream(),
        word_pos: rng.get_word_pos(),
    }
}

/// Rebuilds a generator from a snapshot.
#[must_use]
pub fn restore(state: &RandomState) -> ChaCha8Rng {
    use rand::SeedableRng;

    let mut rng = ChaCha8Rng::from_seed(state.seed);
    rng.set_stream(state.stream);
    rng.set_word_pos(state.word_pos);
    rng
}
