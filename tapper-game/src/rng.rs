//! Deterministic random streams for loot, species picks and mission rolls.
//!
//! Every stream is derived from a single user-visible seed through a
//! domain-separated HMAC so that adding draws to one stream never shifts the
//! others.
use hmac::{Hmac, Mac};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::Sha256;

/// Bundle of independent RNG streams owned by a tapping session.
#[derive(Debug, Clone)]
pub struct RngStreams {
    loot: CountingRng<ChaCha8Rng>,
    species: CountingRng<ChaCha8Rng>,
    missions: CountingRng<ChaCha8Rng>,
}

impl RngStreams {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            loot: CountingRng::new(derive_stream_seed(seed, b"loot")),
            species: CountingRng::new(derive_stream_seed(seed, b"species")),
            missions: CountingRng::new(derive_stream_seed(seed, b"missions")),
        }
    }

    /// Stream used for the weighted loot draw.
    pub const fn loot(&mut self) -> &mut CountingRng<ChaCha8Rng> {
        &mut self.loot
    }

    /// Stream used to pick a species inside a rarity tier.
    pub const fn species(&mut self) -> &mut CountingRng<ChaCha8Rng> {
        &mut self.species
    }

    /// Stream used for daily mission selection.
    pub const fn missions(&mut self) -> &mut CountingRng<ChaCha8Rng> {
        &mut self.missions
    }

    /// Total draws across every stream.
    #[must_use]
    pub const fn total_draws(&self) -> u64 {
        self.loot
            .draws()
            .saturating_add(self.species.draws())
            .saturating_add(self.missions.draws())
    }
}

/// RNG wrapper that counts how many draws were made against it.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha8Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn streams_are_domain_separated() {
        assert_ne!(
            derive_stream_seed(7, b"loot"),
            derive_stream_seed(7, b"species")
        );
        assert_eq!(derive_stream_seed(7, b"loot"), derive_stream_seed(7, b"loot"));
    }

    #[test]
    fn same_seed_replays_same_draws() {
        let mut a = RngStreams::from_user_seed(42);
        let mut b = RngStreams::from_user_seed(42);
        let left: Vec<u32> = (0..8).map(|_| a.loot().gen_range(0..1000)).collect();
        let right: Vec<u32> = (0..8).map(|_| b.loot().gen_range(0..1000)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn draws_are_counted_per_stream() {
        let mut streams = RngStreams::from_user_seed(1);
        let _ = streams.loot().next_u64();
        let _ = streams.loot().next_u32();
        let _ = streams.missions().next_u64();
        assert_eq!(streams.loot().draws(), 2);
        assert_eq!(streams.species().draws(), 0);
        assert_eq!(streams.total_draws(), 3);
    }
}
