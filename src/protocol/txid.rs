//! TX identity derivation.
//!
//! The controller id is run through a 32-bit Galois LFSR using the CRC-32
//! polynomial. Pumping zero bytes through it spreads neighbouring controller
//! ids far apart.

/// LFSR feedback polynomial.
pub const LFSR_POLY: u32 = 0x04C1_1DB7;

/// Zero bytes pumped through the LFSR before the id is taken.
const PUMP_ROUNDS: usize = 4;

/// Advance `seed` by eight steps, shifting in `update` MSB first.
pub fn lfsr_step(seed: u32, update: u8) -> u32 {
    let mut seed = seed;
    for bit in (0..8).rev() {
        let feedback = seed & 0x8000_0000 != 0;
        seed = (seed << 1) | u32::from((update >> bit) & 1);
        if feedback {
            seed ^= LFSR_POLY;
        }
    }
    seed
}

/// Derive the session TX identity from the controller id.
pub fn derive_tx_id(controller_id: u32) -> u32 {
    (0..PUMP_ROUNDS).fold(controller_id, |seed, _| lfsr_step(seed, 0))
}

/// Low three bytes of the identity, most significant first.
pub fn tx_id_bytes(tx_id: u32) -> [u8; 3] {
    [(tx_id >> 16) as u8, (tx_id >> 8) as u8, tx_id as u8]
}
