use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("Sample size must be non-negative, got {0}")]
    NegativeSize(i64),
}

/// Draws at most `n` items without replacement.
///
/// `n` larger than the input returns every item. A seed makes the draw
/// reproducible; without one the RNG is seeded from OS entropy.
pub fn sample<T: Clone>(items: &[T], n: i64, seed: Option<u64>) -> Result<Vec<T>, SampleError> {
    let n = usize::try_from(n).map_err(|_| SampleError::NegativeSize(n))?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    Ok(items.choose_multiple(&mut rng, n).cloned().collect())
}
