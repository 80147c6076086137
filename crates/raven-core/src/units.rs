// ── Byte-size units ──
//
// Sizes are produced by the unit constructors (or read back from a
// document) and always carry a binary unit. Integral values serialize as
// JSON integers so `GB(4)` round-trips as `{"value": 4, "unit": "GiB"}`.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString};

use crate::error::CoreError;

/// Binary size unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum SizeUnit {
    B,
    KiB,
    MiB,
    GiB,
    TiB,
}

impl SizeUnit {
    /// Number of bytes in one of this unit.
    pub fn multiplier(self) -> u64 {
        match self {
            Self::B => 1,
            Self::KiB => 1 << 10,
            Self::MiB => 1 << 20,
            Self::GiB => 1 << 30,
            Self::TiB => 1 << 40,
        }
    }
}

/// A byte quantity: a non-negative value and a binary unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    #[serde(serialize_with = "serialize_number")]
    value: f64,
    unit: SizeUnit,
}

impl Size {
    /// Construct a size, rejecting negative or non-finite values.
    pub fn new(value: f64, unit: SizeUnit) -> Result<Self, CoreError> {
        if !value.is_finite() || value < 0.0 {
            return Err(CoreError::invalid_argument(format!(
                "size must be a non-negative number, got {value}"
            )));
        }
        Ok(Self { value, unit })
    }

    /// Build a size from constants known to be finite and non-negative.
    pub(crate) const fn trusted(value: f64, unit: SizeUnit) -> Self {
        Self { value, unit }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> SizeUnit {
        self.unit
    }

    /// `true` if the value is finite and non-negative. Documents read from
    /// JSON bypass `new`, so the validator checks this.
    pub fn is_valid(&self) -> bool {
        self.value.is_finite() && self.value >= 0.0
    }

    /// Total size in bytes.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn as_bytes(&self) -> f64 {
        self.value * self.unit.multiplier() as f64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

pub fn bytes(value: f64) -> Result<Size, CoreError> {
    Size::new(value, SizeUnit::B)
}

pub fn kibibytes(value: f64) -> Result<Size, CoreError> {
    Size::new(value, SizeUnit::KiB)
}

pub fn mebibytes(value: f64) -> Result<Size, CoreError> {
    Size::new(value, SizeUnit::MiB)
}

pub fn gibibytes(value: f64) -> Result<Size, CoreError> {
    Size::new(value, SizeUnit::GiB)
}

pub fn tebibytes(value: f64) -> Result<Size, CoreError> {
    Size::new(value, SizeUnit::TiB)
}

// ── Serde helpers ────────────────────────────────────────────────────

/// Write integral finite values as integers, everything else as a float.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    match integral(*value) {
        Some(i) => serializer.serialize_i64(i),
        None => serializer.serialize_f64(*value),
    }
}

/// The `i64` equal to `value`, if there is one within the safe-integer range.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::as_conversions
)]
pub(crate) fn integral(value: f64) -> Option<i64> {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_SAFE {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn constructors_pick_units() {
        assert_eq!(gibibytes(4.0).unwrap().unit(), SizeUnit::GiB);
        assert_eq!(kibibytes(1.0).unwrap().as_bytes(), 1024.0);
        assert_eq!(tebibytes(0.0).unwrap().as_bytes(), 0.0);
    }

    #[test]
    fn negative_values_are_rejected() {
        assert!(matches!(
            mebibytes(-1.0),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(bytes(f64::NAN).is_err());
    }

    #[test]
    fn integral_values_serialize_as_integers() {
        let json = serde_json::to_string(&gibibytes(4.0).unwrap()).unwrap();
        assert_eq!(json, r#"{"value":4,"unit":"GiB"}"#);

        let json = serde_json::to_string(&mebibytes(1.5).unwrap()).unwrap();
        assert_eq!(json, r#"{"value":1.5,"unit":"MiB"}"#);
    }

    #[test]
    fn reads_back_from_json() {
        let size: Size = serde_json::from_str(r#"{"value": 12, "unit": "GiB"}"#).unwrap();
        assert_eq!(size, gibibytes(12.0).unwrap());
        assert_eq!(size.to_string(), "12 GiB");
    }
}
