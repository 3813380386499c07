//! Warning policy for computed heights

use std::collections::BTreeSet;
use crate::config::{Config, DEFAULT_HEIGHT_LIMIT_M};
use crate::error::{Error, Result};
use super::result::WarningKind;

/// Largest manual height accepted
pub const MAX_MANUAL_HEIGHT_M: f64 = 10_000.0;

/// Thresholds used to flag results
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightPolicy {
    /// Heights strictly above this are flagged
    pub regulatory_limit_m: f64,
}

impl Default for HeightPolicy {
    fn default() -> Self {
        Self {
            regulatory_limit_m: DEFAULT_HEIGHT_LIMIT_M,
        }
    }
}

impl HeightPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            regulatory_limit_m: config.height_limit_m,
        }
    }

    /// Warnings for a height above terrain
    pub fn evaluate(&self, height_m: f64) -> BTreeSet<WarningKind> {
        let mut warnings = BTreeSet::new();
        if height_m < 0.0 {
            warnings.insert(WarningKind::NegativeHeight);
        }
        if height_m > self.regulatory_limit_m {
            warnings.insert(WarningKind::AboveRegulatoryLimit);
        }
        warnings
    }

    /// Validates a manual height before it is applied
    pub fn validate_manual(&self, height_m: f64) -> Result<f64> {
        if !height_m.is_finite() || !(0.0..=MAX_MANUAL_HEIGHT_M).contains(&height_m) {
            return Err(Error::InvalidManualInput(format!(
                "{} is outside 0..={} m",
                height_m, MAX_MANUAL_HEIGHT_M
            )));
        }
        Ok(height_m)
    }

    /// Parses and validates a manual height typed by the user
    pub fn parse_manual(&self, input: &str) -> Result<f64> {
        let trimmed = input.trim();
        let value: f64 = trimmed
            .strip_suffix('m')
            .unwrap_or(trimmed)
            .trim()
            .parse()
            .map_err(|_| Error::InvalidManualInput(format!("'{}' is not a number", input)))?;
        self.validate_manual(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_height_flagged() {
        let warnings = HeightPolicy::default().evaluate(-50.0);
        assert_eq!(warnings, BTreeSet::from([WarningKind::NegativeHeight]));
    }

    #[test]
    fn test_above_limit_flagged() {
        let policy = HeightPolicy::default();
        assert!(policy.evaluate(150.0).contains(&WarningKind::AboveRegulatoryLimit));
        assert!(policy.evaluate(120.0).is_empty());
        assert!(policy.evaluate(0.0).is_empty());
    }

    #[test]
    fn test_custom_limit() {
        let policy = HeightPolicy { regulatory_limit_m: 50.0 };
        assert!(policy.evaluate(60.0).contains(&WarningKind::AboveRegulatoryLimit));
    }

    #[test]
    fn test_parse_manual() {
        let policy = HeightPolicy::default();
        assert_eq!(policy.parse_manual(" 45 ").unwrap(), 45.0);
        assert_eq!(policy.parse_manual("62.5 m").unwrap(), 62.5);
        assert_eq!(policy.parse_manual("45m").unwrap(), 45.0);
        assert!(matches!(policy.parse_manual("45mm"), Err(Error::InvalidManualInput(_))));
        assert!(matches!(policy.parse_manual("45 mm"), Err(Error::InvalidManualInput(_))));
        assert!(matches!(policy.parse_manual("abc"), Err(Error::InvalidManualInput(_))));
        assert!(matches!(policy.parse_manual("-3"), Err(Error::InvalidManualInput(_))));
        assert!(policy.parse_manual("20000").is_err());
        assert!(policy.validate_manual(f64::INFINITY).is_err());
    }
}
