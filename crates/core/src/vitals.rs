//! Tracked vitals, rating buckets and the standard CWV classification
//! thresholds.
//!
//! Ratings normally come from the observation source. [`Rating::classify`]
//! is used when a source reports a raw value without one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A tracked Core Web Vital.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VitalName {
    /// Largest Contentful Paint (ms).
    Lcp,
    /// Interaction to Next Paint (ms).
    Inp,
    /// Cumulative Layout Shift (unitless score).
    Cls,
    /// First Contentful Paint (ms).
    Fcp,
    /// Time to First Byte (ms).
    Ttfb,
}

impl VitalName {
    pub const ALL: [VitalName; 5] = [
        VitalName::Lcp,
        VitalName::Inp,
        VitalName::Cls,
        VitalName::Fcp,
        VitalName::Ttfb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VitalName::Lcp => "LCP",
            VitalName::Inp => "INP",
            VitalName::Cls => "CLS",
            VitalName::Fcp => "FCP",
            VitalName::Ttfb => "TTFB",
        }
    }

    /// Upper bounds (inclusive) of the `good` and `needs-improvement` buckets.
    pub fn thresholds(&self) -> Thresholds {
        match self {
            VitalName::Lcp => Thresholds::new(2500.0, 4000.0),
            VitalName::Inp => Thresholds::new(200.0, 500.0),
            VitalName::Cls => Thresholds::new(0.1, 0.25),
            VitalName::Fcp => Thresholds::new(1800.0, 3000.0),
            VitalName::Ttfb => Thresholds::new(800.0, 1800.0),
        }
    }
}

impl fmt::Display for VitalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VitalName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VitalName::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown vital '{s}'"))
    }
}

/// Classification bucket for a vital value.
///
/// Ordered from best to worst so `max()` yields the worst rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::NeedsImprovement => "needs-improvement",
            Rating::Poor => "poor",
        }
    }

    /// Classify a raw value using the standard thresholds for `name`.
    pub fn classify(name: VitalName, value: f64) -> Rating {
        let t = name.thresholds();
        if value <= t.good {
            Rating::Good
        } else if value <= t.poor {
            Rating::NeedsImprovement
        } else {
            Rating::Poor
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(Rating::Good),
            "needs-improvement" => Ok(Rating::NeedsImprovement),
            "poor" => Ok(Rating::Poor),
            other => Err(format!("unknown rating '{other}'")),
        }
    }
}

/// Bucket boundaries for one vital.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Values at or below this are `good`.
    pub good: f64,
    /// Values at or below this (and above `good`) are `needs-improvement`.
    pub poor: f64,
}

impl Thresholds {
    const fn new(good: f64, poor: f64) -> Self {
        Self { good, poor }
    }
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
