use std::fmt;

use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore as _, SeedableRng};

use dlcoal_core::cogs::{RngCore, SplittableRng};

/// ChaCha8 stream cipher generator, whose 64 bit stream id is used to hand
/// out independent, reproducible substreams.
#[allow(clippy::module_name_repetitions)]
#[derive(Clone)]
pub struct ChaCha(ChaCha8Rng);

impl fmt::Debug for ChaCha {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("ChaCha")
            .field("stream", &self.0.get_stream())
            .field("word_pos", &self.0.get_word_pos())
            .finish()
    }
}

impl RngCore for ChaCha {
    type Seed = [u8; 32];

    #[must_use]
    #[inline]
    fn from_seed(seed: Self::Seed) -> Self {
        Self(ChaCha8Rng::from_seed(seed))
    }

    #[must_use]
    #[inline]
    fn sample_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
}

impl SplittableRng for ChaCha {
    fn split_to_stream(mut self, stream: u64) -> Self {
        self.0.set_stream(stream);
        self.0.set_word_pos(0);

        self
    }
}
