use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The icons a wheel reel can land on.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Star,
    Crown,
    Diamond,
    Cherry,
    Bell,
    Clover,
    Gift,
    Trophy,
}

impl Symbol {
    pub const ALL: [Symbol; 8] = [
        Symbol::Star,
        Symbol::Crown,
        Symbol::Diamond,
        Symbol::Cherry,
        Symbol::Bell,
        Symbol::Clover,
        Symbol::Gift,
        Symbol::Trophy,
    ];
}

/// One spin result: three symbols, a win when all three match.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SpinOutcome {
    pub symbols: [Symbol; 3],
}

impl SpinOutcome {
    pub fn is_win(&self) -> bool {
        self.symbols[0] == self.symbols[1] && self.symbols[1] == self.symbols[2]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WheelConfigError {
    /// The no-replacement draw needs at least 3 distinct symbols.
    AlphabetTooSmall { len: usize },
}

impl fmt::Display for WheelConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlphabetTooSmall { len } => {
                write!(f, "wheel alphabet has {} symbols, need at least 3", len)
            }
        }
    }
}

impl std::error::Error for WheelConfigError {}

/// Draws spin outcomes, conditioned on whether the current week already has
/// a prize winner. When it does, the three symbols are drawn without
/// replacement so a three-of-a-kind is impossible regardless of what the
/// ledger later says.
#[derive(Debug, Clone)]
pub struct SpinOutcomeGenerator {
    alphabet: Vec<Symbol>,
}

impl SpinOutcomeGenerator {
    pub fn new(alphabet: Vec<Symbol>) -> Result<Self, WheelConfigError> {
        if alphabet.len() < 3 {
            return Err(WheelConfigError::AlphabetTooSmall { len: alphabet.len() });
        }
        Ok(Self { alphabet })
    }

    pub fn with_default_alphabet() -> Self {
        Self {
            alphabet: Symbol::ALL.to_vec(),
        }
    }

    pub fn generate(&self, week_has_winner: bool) -> SpinOutcome {
        self.generate_with(&mut OsRng, week_has_winner)
    }

    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R, week_has_winner: bool) -> SpinOutcome {
        if week_has_winner {
            // len >= 3 is guaranteed by the constructor
            let picks: Vec<Symbol> = self.alphabet.choose_multiple(rng, 3).copied().collect();
            SpinOutcome {
                symbols: [picks[0], picks[1], picks[2]],
            }
        } else {
            let mut symbols = [self.alphabet[0]; 3];
            for slot in symbols.iter_mut() {
                *slot = self.alphabet[rng.gen_range(0..self.alphabet.len())];
            }
            SpinOutcome { symbols }
        }
    }
}

// === API Types ===

#[derive(Debug, Serialize, Deserialize)]
pub struct WheelSpinRequest {
    pub timestamp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WheelSpinResponse {
    pub success: bool,
    pub is_win: bool,
    pub symbols: Option<[Symbol; 3]>,
    pub message: Option<String>,
    pub remaining_spins: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WheelStatusResponse {
    pub remaining_spins: u32,
    pub reset_in_seconds: Option<u64>,
    pub weekly_prize_available: bool,
}

// Constants for frontend animation
pub const SPIN_DURATION_MS: u32 = 3000; // Duration of spin animation in milliseconds
pub const SYMBOL_CYCLE_MS: u32 = 100; // How often the reels swap symbols while spinning
