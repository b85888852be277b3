use core::convert::AsMut;

#[allow(clippy::module_name_repetitions)]
pub trait RngCore: Sized + Clone + core::fmt::Debug {
    type Seed: AsMut<[u8]> + Default + Sized;

    #[must_use]
    fn from_seed(seed: Self::Seed) -> Self;

    #[must_use]
    fn sample_u64(&mut self) -> u64;
}

#[allow(clippy::module_name_repetitions)]
pub trait SeedableRng: RngCore {
    #[must_use]
    fn seed_from_u64(mut state: u64) -> Self {
        // Implementation from:
        // https://docs.rs/rand/0.7.3/rand/trait.SeedableRng.html#method.seed_from_u64

        // PCG32 expands the u64 state into the seed bytes
        const MUL: u64 = 6_364_136_223_846_793_005_u64;
        const INC: u64 = 11_634_580_027_462_260_723_u64;

        let mut seed = Self::Seed::default();

        for chunk in seed.as_mut().chunks_mut(4) {
            // Advance first to get away from low Hamming weight inputs
            state = state.wrapping_mul(MUL).wrapping_add(INC);

            #[allow(clippy::cast_possible_truncation)]
            let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
            #[allow(clippy::cast_possible_truncation)]
            let rot = (state >> 59) as u32;
            let x = xorshifted.rotate_right(rot).to_le_bytes();

            chunk.copy_from_slice(&x[..chunk.len()]);
        }

        Self::from_seed(seed)
    }
}

impl<R: RngCore> SeedableRng for R {}

/// Generators that can be deterministically split into independent streams,
/// e.g. one per Monte-Carlo draw.
#[allow(clippy::module_name_repetitions)]
pub trait SplittableRng: RngCore {
    #[must_use]
    fn split_to_stream(self, stream: u64) -> Self;
}
