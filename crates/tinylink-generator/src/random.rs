use crate::Generator;
use rand::rngs::OsRng;
use rand::TryRngCore;
use tinylink_core::error::CoreError;
use tinylink_core::shortcode::{MAX_LENGTH, MIN_LENGTH};
use tinylink_core::{GeneratorError, ShortCode};

/// The 62 symbols a generated code is drawn from.
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const DEFAULT_LENGTH: usize = 7;

/// Largest multiple of 62 that fits in a byte. Bytes at or above it are
/// rejected so every symbol stays equally likely.
const REJECTION_BOUND: u8 = (256 - 256 % 62) as u8;

/// Generates unguessable fixed-length codes from the operating system CSPRNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    /// Creates a generator producing codes of `length` characters.
    ///
    /// `length` must be within the short code bounds (3..=32).
    pub fn new(length: usize) -> Result<Self, CoreError> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(CoreError::InvalidCodeLength {
                length,
                min: MIN_LENGTH,
                max: MAX_LENGTH,
            });
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
        }
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> Result<ShortCode, GeneratorError> {
        random_code(self.length).map(ShortCode::new_unchecked)
    }
}

/// Draws `length` symbols uniformly, with replacement, from [`ALPHABET`].
///
/// A failing entropy source is reported, never papered over with a weaker RNG.
pub fn random_code(length: usize) -> Result<String, GeneratorError> {
    let mut code = String::with_capacity(length);
    // ~3% of bytes get rejected, so a small slack usually avoids a second read
    let mut buf = vec![0u8; length + length / 8 + 2];

    while code.len() < length {
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| GeneratorError::EntropyUnavailable(e.to_string()))?;

        for &byte in buf.iter().filter(|&&b| b < REJECTION_BOUND) {
            code.push(ALPHABET[byte as usize % ALPHABET.len()] as char);
            if code.len() == length {
                break;
            }
        }
    }

    Ok(code)
}
