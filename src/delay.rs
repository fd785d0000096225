use std::time::Duration;

use anyhow::{anyhow, ensure, Result};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::model::Category;

/// Standard typing-test assumption.
pub const AVERAGE_CHARS_PER_WORD: f64 = 5.0;
pub const SPEED_BOOST_FACTOR: f64 = 1.5;
/// Slowest accepted speed: 12s per character.
pub const MIN_WPM: f64 = 1.0;
/// Fastest accepted speed, also the ceiling for repeated boosts.
pub const MAX_WPM: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WpmRange {
    min: f64,
    max: f64,
}

impl WpmRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        ensure!(min.is_finite(), "wpm_min must be finite");
        ensure!(max.is_finite(), "wpm_max must be finite");
        ensure!(min > 0.0 && max > 0.0, "wpm_min and wpm_max must be > 0");
        ensure!(
            min >= MIN_WPM && max <= MAX_WPM,
            "wpm_min and wpm_max must be within {MIN_WPM}..={MAX_WPM}"
        );
        ensure!(min <= max, "wpm_min must be <= wpm_max");
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Both ends sped up by the boost factor, saturating at [`MAX_WPM`].
    pub fn boosted(self) -> Self {
        Self {
            min: (self.min * SPEED_BOOST_FACTOR).min(MAX_WPM),
            max: (self.max * SPEED_BOOST_FACTOR).min(MAX_WPM),
        }
    }
}

/// How much faster than plain text each category is typed.
pub fn speed_divisor(category: Category) -> f64 {
    match category {
        Category::Keyword => 1.8,
        Category::Boilerplate => 2.0,
        Category::Bracket => 3.0,
        Category::Punctuation | Category::Plain => 1.0,
    }
}

/// Seconds per character at a given WPM.
pub fn secs_per_char(wpm: f64) -> f64 {
    60.0 / (wpm * AVERAGE_CHARS_PER_WORD)
}

#[derive(Debug, Clone)]
pub struct DelayModel {
    range: WpmRange,
    statement_pause: Duration,
}

impl DelayModel {
    pub fn new(range: WpmRange, statement_pause: Duration) -> Self {
        Self {
            range,
            statement_pause,
        }
    }

    pub fn range(&self) -> WpmRange {
        self.range
    }

    pub fn statement_pause(&self) -> Duration {
        self.statement_pause
    }

    /// Raise the WPM range for every delay computed from now on.
    pub fn boost(&mut self) {
        self.range = self.range.boosted();
    }

    pub fn base_delay_secs(&self, rng: &mut impl Rng) -> f64 {
        let wpm = Uniform::new_inclusive(self.range.min, self.range.max).sample(rng);
        secs_per_char(wpm)
    }

    /// Delay before typing a character of `category`.
    ///
    /// `after_statement_end` adds the fixed beat that follows a statement
    /// terminator typed just before.
    pub fn char_delay(
        &self,
        category: Category,
        after_statement_end: bool,
        rng: &mut impl Rng,
    ) -> Result<Duration> {
        let secs = self.base_delay_secs(rng) / speed_divisor(category);
        let mut delay = Duration::try_from_secs_f64(secs.max(0.0))
            .map_err(|e| anyhow!("character delay of {secs}s is not representable: {e}"))?;
        if after_statement_end {
            delay += self.statement_pause;
        }
        Ok(delay)
    }
}
