//! Rational numbers for aspect ratios and frame rates

use serde::{Deserialize, Serialize};
use std::fmt;

/// A ratio of two unsigned integers
///
/// Video tracks report aspect ratio and frame rate as numerator/denominator
/// pairs rather than floats, so exact values like 30000/1001 survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    /// Creates a new rational. A zero denominator is normalized to 1.
    pub fn new(num: u32, den: u32) -> Self {
        Self {
            num,
            den: if den == 0 { 1 } else { den },
        }
    }

    /// Returns the ratio as a float
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Returns true if the ratio is zero
    pub fn is_zero(&self) -> bool {
        self.num == 0
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
