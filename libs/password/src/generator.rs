//! Memorable password generation
//!
//! Generated passwords have the shape `Adjective Noun Digits Symbol`, for
//! example `BraveOtter482#`. Every output satisfies [`crate::validate`].

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracing::debug;

/// Number of options offered when the caller does not say
pub const DEFAULT_OPTION_COUNT: usize = 3;

pub const ADJECTIVES: [&str; 24] = [
    "Happy", "Bright", "Swift", "Calm", "Brave", "Clever", "Gentle", "Golden", "Quiet", "Sunny",
    "Lucky", "Mighty", "Noble", "Proud", "Rapid", "Silver", "Smart", "Steady", "Bold", "Cosmic",
    "Fresh", "Jolly", "Vivid", "Wise",
];

pub const NOUNS: [&str; 23] = [
    "Tiger", "Eagle", "River", "Falcon", "Ocean", "Maple", "Garden", "Rocket", "Panda", "Comet",
    "Forest", "Harbor", "Lion", "Meadow", "Otter", "Planet", "Robin", "Summit", "Thunder",
    "Valley", "Willow", "Fox", "Star",
];

/// Symbols appended by the generator; a subset of the policy's special set
pub const SYMBOLS: [char; 10] = ['!', '@', '#', '$', '%', '&', '*', '+', '=', '?'];

/// Generator of memorable, policy-compliant passwords
#[derive(Debug)]
pub struct PasswordGenerator<R = StdRng> {
    rng: R,
}

impl PasswordGenerator<StdRng> {
    /// Create a generator seeded from the operating system
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for PasswordGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> PasswordGenerator<R> {
    /// Create a generator drawing from `rng`
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Generate one password
    pub fn generate(&mut self) -> String {
        let adjective = pick(&mut self.rng, &ADJECTIVES);
        let noun = pick(&mut self.rng, &NOUNS);
        let digit_count = self.rng.gen_range(2..=3);
        let symbol = pick(&mut self.rng, &SYMBOLS);

        let mut password = String::with_capacity(adjective.len() + noun.len() + digit_count + 1);
        password.push_str(adjective);
        password.push_str(noun);
        for _ in 0..digit_count {
            let digit = self.rng.gen_range(0..10u32);
            password.push(char::from_digit(digit, 10).unwrap_or('0'));
        }
        password.push(symbol);

        password
    }

    /// Generate `count` independent passwords; duplicates are possible
    pub fn generate_options(&mut self, count: usize) -> Vec<String> {
        debug!("Generating {} password options", count);
        (0..count).map(|_| self.generate()).collect()
    }
}

fn pick<R: Rng, T: Copy>(rng: &mut R, items: &[T]) -> T {
    // The lists are non-empty constants
    *items.choose(rng).unwrap_or(&items[0])
}

/// Generate one password from an OS-seeded generator
pub fn generate_password() -> String {
    PasswordGenerator::new().generate()
}

/// Generate `count` passwords from an OS-seeded generator
pub fn generate_password_options(count: usize) -> Vec<String> {
    PasswordGenerator::new().generate_options(count)
}
