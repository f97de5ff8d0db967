use rand_core::{impls, Error, RngCore, SeedableRng};

// Integer-only mixing so a seed gives the same track on every platform.
#[derive(Debug, Clone)]
pub struct TrackRng {
    state: u32,
}

impl TrackRng {
    // Top 24 bits only, so the value never rounds up to 1.0.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }
}

impl RngCore for TrackRng {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let s = self.state;
        let mut n = (s ^ (s >> 15)).wrapping_mul(s | 1);
        n ^= n.wrapping_add((n ^ (n >> 7)).wrapping_mul(n | 61));
        n ^ (n >> 14)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for TrackRng {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            state: u32::from_le_bytes(seed),
        }
    }

    fn seed_from_u64(state: u64) -> Self {
        Self {
            state: state as u32,
        }
    }
}
