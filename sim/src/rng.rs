//! Per-entity random streams.
//!
//! Every entity owns an independent PCG stream derived from the process seed
//! and its index, so placement draws are reproducible per entity and never
//! contend across workers.

use rand_pcg::Pcg32;

/// Deterministic random stream owned by one entity.
pub type StreamState = Pcg32;

/// SplitMix64 step, used to decorrelate neighbouring indices.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Split the process seed into the stream for `entity_index`.
pub fn seed_for(process_seed: u64, entity_index: usize) -> StreamState {
    let mut state = process_seed ^ (entity_index as u64).wrapping_mul(0xD6E8_FEB8_6659_FD93);
    let seed = splitmix64(&mut state);
    let stream = splitmix64(&mut state);
    Pcg32::new(seed, stream)
}
