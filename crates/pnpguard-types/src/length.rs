//! Unit-tagged scalar lengths.
//!
//! A [`Length`] always carries its [`LengthUnit`].  Binary operations convert
//! the right-hand side into the units of the left-hand side before combining,
//! so `1in + 1mm` is `1.0393…in`.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::GuardError;

/// Supported length units.  Millimeters are the base unit for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum LengthUnit {
    #[default]
    #[serde(rename = "mm")]
    Millimeters,
    #[serde(rename = "cm")]
    Centimeters,
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "in")]
    Inches,
    #[serde(rename = "ft")]
    Feet,
    #[serde(rename = "mil")]
    Mils,
    #[serde(rename = "μm", alias = "um")]
    Microns,
}

impl LengthUnit {
    pub const ALL: [LengthUnit; 7] = [
        LengthUnit::Millimeters,
        LengthUnit::Centimeters,
        LengthUnit::Meters,
        LengthUnit::Inches,
        LengthUnit::Feet,
        LengthUnit::Mils,
        LengthUnit::Microns,
    ];

    /// Abbreviation used when formatting and parsing.
    pub fn short_name(self) -> &'static str {
        match self {
            LengthUnit::Millimeters => "mm",
            LengthUnit::Centimeters => "cm",
            LengthUnit::Meters => "m",
            LengthUnit::Inches => "in",
            LengthUnit::Feet => "ft",
            LengthUnit::Mils => "mil",
            LengthUnit::Microns => "μm",
        }
    }

    /// How many millimeters one of this unit is.
    fn millimeters_per_unit(self) -> f64 {
        match self {
            LengthUnit::Millimeters => 1.0,
            LengthUnit::Centimeters => 10.0,
            LengthUnit::Meters => 1000.0,
            LengthUnit::Inches => 25.4,
            LengthUnit::Feet => 25.4 * 12.0,
            LengthUnit::Mils => 25.4 / 1000.0,
            LengthUnit::Microns => 1.0 / 1000.0,
        }
    }

    fn from_short_name(s: &str) -> Option<Self> {
        let normalized = s.trim().replace('u', "μ");
        Self::ALL
            .into_iter()
            .find(|unit| unit.short_name().eq_ignore_ascii_case(&normalized))
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// A scalar length with units.
///
/// Serialized as text, e.g. `"1.500mm"`, so machine files can state lengths in
/// whichever units they were measured in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Length {
    value: f64,
    units: LengthUnit,
}

impl Length {
    pub fn new(value: f64, units: LengthUnit) -> Self {
        Self { value, units }
    }

    /// Shorthand for a length in millimeters.
    pub fn mm(value: f64) -> Self {
        Self::new(value, LengthUnit::Millimeters)
    }

    pub fn zero() -> Self {
        Self::mm(0.0)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn units(&self) -> LengthUnit {
        self.units
    }

    /// Convert to `units`, going through millimeters.
    pub fn convert_to_units(self, units: LengthUnit) -> Self {
        if self.units == units {
            return self;
        }
        let mm = self.value * self.units.millimeters_per_unit();
        Self::new(mm / units.millimeters_per_unit(), units)
    }

    /// The value of this length in millimeters.
    pub fn to_mm(self) -> f64 {
        self.convert_to_units(LengthUnit::Millimeters).value
    }

    /// Total ordering after converting `other` into `self`'s units.
    pub fn compare(&self, other: &Length) -> Ordering {
        self.value
            .total_cmp(&other.convert_to_units(self.units).value)
    }

    /// Parse `"<number><spaces><unit>"`.  A missing unit falls back to
    /// `default_units`; when that is `None` as well, the text is rejected.
    ///
    /// The number part is the longest prefix made of digits, `-` and `.`.
    /// A `u` in the unit is read as `μ`, so `"25um"` means microns.
    pub fn parse(text: &str, default_units: Option<LengthUnit>) -> Result<Self, GuardError> {
        let invalid = || GuardError::InvalidLength(text.to_string());
        let s = text.trim();
        let start_of_units = s.find(|ch: char| ch != '-' && ch != '.' && !ch.is_ascii_digit());

        let (value_str, units) = match start_of_units {
            Some(idx) => {
                let units = LengthUnit::from_short_name(&s[idx..]).ok_or_else(invalid)?;
                (&s[..idx], units)
            }
            None => (s, default_units.ok_or_else(invalid)?),
        };

        let value = value_str.trim().parse::<f64>().map_err(|_| invalid())?;
        Ok(Self::new(value, units))
    }
}

impl Default for Length {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}{}", self.value, self.units.short_name())
    }
}

impl FromStr for Length {
    type Err = GuardError;

    /// Bare numbers are read as millimeters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, Some(LengthUnit::Millimeters))
    }
}

impl TryFrom<String> for Length {
    type Error = GuardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Length> for String {
    fn from(length: Length) -> Self {
        format!("{}{}", length.value, length.units.short_name())
    }
}

impl JsonSchema for Length {
    fn schema_name() -> String {
        "Length".to_string()
    }

    fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(generator)
    }
}

impl Add for Length {
    type Output = Length;

    fn add(self, rhs: Length) -> Length {
        Length::new(self.value + rhs.convert_to_units(self.units).value, self.units)
    }
}

impl Sub for Length {
    type Output = Length;

    fn sub(self, rhs: Length) -> Length {
        Length::new(self.value - rhs.convert_to_units(self.units).value, self.units)
    }
}

impl Mul<f64> for Length {
    type Output = Length;

    fn mul(self, rhs: f64) -> Length {
        Length::new(self.value * rhs, self.units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn inches_convert_to_millimeters() {
        let l = Length::new(1.0, LengthUnit::Inches);
        assert!(close(l.to_mm(), 25.4));
        assert!(close(Length::new(1000.0, LengthUnit::Mils).to_mm(), 25.4));
        assert!(close(Length::new(250.0, LengthUnit::Microns).to_mm(), 0.25));
    }

    #[test]
    fn conversion_between_non_base_units() {
        let l = Length::new(1.0, LengthUnit::Feet).convert_to_units(LengthUnit::Inches);
        assert!(close(l.value(), 12.0));
        assert_eq!(l.units(), LengthUnit::Inches);
    }

    #[test]
    fn addition_keeps_lhs_units() {
        let sum = Length::mm(1.0) + Length::new(1.0, LengthUnit::Centimeters);
        assert_eq!(sum.units(), LengthUnit::Millimeters);
        assert!(close(sum.value(), 11.0));
    }

    #[test]
    fn compare_across_units() {
        let a = Length::new(1.0, LengthUnit::Inches);
        let b = Length::mm(25.0);
        assert_eq!(a.compare(&b), Ordering::Greater);
        assert_eq!(b.compare(&a), Ordering::Less);
        assert_eq!(Length::mm(10.0).compare(&Length::new(1.0, LengthUnit::Centimeters)), Ordering::Equal);
    }

    #[test]
    fn parse_with_units() {
        let l = Length::parse("1.5mm", None).unwrap();
        assert_eq!(l, Length::mm(1.5));

        let l = Length::parse("  -3 in ", None).unwrap();
        assert_eq!(l, Length::new(-3.0, LengthUnit::Inches));

        let l = Length::parse("25um", None).unwrap();
        assert_eq!(l.units(), LengthUnit::Microns);

        let l = Length::parse("2 MM", None).unwrap();
        assert_eq!(l.units(), LengthUnit::Millimeters);
    }

    #[test]
    fn parse_bare_number_uses_default_units() {
        assert_eq!(
            Length::parse("4", Some(LengthUnit::Inches)).unwrap(),
            Length::new(4.0, LengthUnit::Inches)
        );
        assert!(Length::parse("4", None).is_err());
        assert_eq!("7".parse::<Length>().unwrap(), Length::mm(7.0));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Length::parse("abc", Some(LengthUnit::Millimeters)),
            Err(GuardError::InvalidLength(_))
        ));
        assert!(Length::parse("1.2furlong", None).is_err());
        assert!(Length::parse("--1mm", None).is_err());
    }

    #[test]
    fn display_uses_three_decimals() {
        assert_eq!(Length::mm(1.5).to_string(), "1.500mm");
    }

    #[test]
    fn serde_as_text() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            height: Length,
        }
        let h: Holder = serde_json::from_str(r#"{"height":"0.5in"}"#).unwrap();
        assert_eq!(h.height, Length::new(0.5, LengthUnit::Inches));

        let json = serde_json::to_string(&Holder { height: Length::mm(2.0) }).unwrap();
        assert_eq!(json, r#"{"height":"2mm"}"#);
    }
}
