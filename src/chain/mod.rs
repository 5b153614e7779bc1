pub mod normalize;
pub mod oi;

use serde::{Deserialize, Serialize};

/// Option side. Serialized with the exchange's CE/PE convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "CE")]
    Call,
    #[serde(rename = "PE")]
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CE"),
            Self::Put => write!(f, "PE"),
        }
    }
}

/// Strikes arrive as f64 but are keyed in maps and compared for equality.
/// Quantize to 1/100 of a point so 22050.0 and 22050.000001 collide.
#[inline]
pub fn strike_key(strike: f64) -> i64 {
    (strike * 100.0).round() as i64
}
