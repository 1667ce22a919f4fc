pub mod random;

pub use random::{random_code, RandomGenerator};

use tinylink_core::{GeneratorError, ShortCode};

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage,
/// so a generated code may already be taken. Resolving collisions is up to
/// the caller.
pub trait Generator: Send + Sync + 'static {
    /// Generates a new candidate short code.
    fn generate(&self) -> Result<ShortCode, GeneratorError>;
}
