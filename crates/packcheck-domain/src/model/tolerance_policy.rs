//! Weight tolerance policy
//!
//! Units are fixed here and converted exactly once by the calculator:
//! `percentage` is a percent of the expected weight, `absolute_grams` is in
//! grams, `min_tolerance`/`max_tolerance` are in kilograms.

use packcheck_types::ValidationError;
use serde::{Deserialize, Serialize};

/// Which components make up the tolerance band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToleranceKind {
    Percentage,
    Absolute,
    #[default]
    Combined,
}

/// Shape of the portion-count scaling curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingCurve {
    /// 1.0 narrows linearly, >1.0 narrows late, <1.0 narrows early
    #[serde(default = "default_exponent")]
    pub exponent: f64,
}

fn default_exponent() -> f64 {
    1.0
}

impl Default for ScalingCurve {
    fn default() -> Self {
        Self {
            exponent: default_exponent(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightTolerancePolicy {
    #[serde(default)]
    pub kind: ToleranceKind,
    #[serde(default = "default_percentage")]
    pub percentage: f64,
    #[serde(default = "default_absolute_grams")]
    pub absolute_grams: f64,
    #[serde(default = "default_min_tolerance")]
    pub min_tolerance: f64,
    #[serde(default = "default_max_tolerance")]
    pub max_tolerance: f64,
    #[serde(default = "default_min_portions")]
    pub min_portions: u32,
    #[serde(default = "default_max_portions")]
    pub max_portions: u32,
    /// Portion scaling is applied only when a curve is present
    #[serde(default)]
    pub scaling: Option<ScalingCurve>,
}

fn default_percentage() -> f64 {
    2.0
}

fn default_absolute_grams() -> f64 {
    10.0
}

fn default_min_tolerance() -> f64 {
    0.005
}

fn default_max_tolerance() -> f64 {
    0.1
}

fn default_min_portions() -> u32 {
    1
}

fn default_max_portions() -> u32 {
    20
}

impl Default for WeightTolerancePolicy {
    fn default() -> Self {
        Self {
            kind: ToleranceKind::default(),
            percentage: default_percentage(),
            absolute_grams: default_absolute_grams(),
            min_tolerance: default_min_tolerance(),
            max_tolerance: default_max_tolerance(),
            min_portions: default_min_portions(),
            max_portions: default_max_portions(),
            scaling: None,
        }
    }
}

impl WeightTolerancePolicy {
    pub fn percentage(percentage: f64) -> Self {
        Self {
            kind: ToleranceKind::Percentage,
            percentage,
            ..Self::default()
        }
    }

    pub fn absolute(grams: f64) -> Self {
        Self {
            kind: ToleranceKind::Absolute,
            absolute_grams: grams,
            ..Self::default()
        }
    }

    pub fn combined(percentage: f64, grams: f64) -> Self {
        Self {
            kind: ToleranceKind::Combined,
            percentage,
            absolute_grams: grams,
            ..Self::default()
        }
    }

    pub fn with_scaling(mut self, curve: ScalingCurve) -> Self {
        self.scaling = Some(curve);
        self
    }

    pub fn with_bounds(mut self, min_tolerance: f64, max_tolerance: f64) -> Self {
        self.min_tolerance = min_tolerance;
        self.max_tolerance = max_tolerance;
        self
    }

    pub fn with_portion_range(mut self, min_portions: u32, max_portions: u32) -> Self {
        self.min_portions = min_portions;
        self.max_portions = max_portions;
        self
    }

    /// Check every field, reporting the first offending one
    pub fn validate(&self) -> Result<(), ValidationError> {
        fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
            if !value.is_finite() {
                return Err(ValidationError::new(field, "must be a finite number"));
            }
            if value < 0.0 {
                return Err(ValidationError::new(field, format!("must be >= 0, got {}", value)));
            }
            Ok(())
        }

        non_negative("percentage", self.percentage)?;
        non_negative("absolute_grams", self.absolute_grams)?;
        non_negative("min_tolerance", self.min_tolerance)?;
        non_negative("max_tolerance", self.max_tolerance)?;

        if self.min_tolerance > self.max_tolerance {
            return Err(ValidationError::new(
                "min_tolerance",
                format!(
                    "{} exceeds max_tolerance {}",
                    self.min_tolerance, self.max_tolerance
                ),
            ));
        }
        if self.min_portions > self.max_portions {
            return Err(ValidationError::new(
                "min_portions",
                format!(
                    "{} exceeds max_portions {}",
                    self.min_portions, self.max_portions
                ),
            ));
        }
        if let Some(curve) = self.scaling {
            if !curve.exponent.is_finite() || curve.exponent <= 0.0 {
                return Err(ValidationError::new(
                    "scaling.exponent",
                    format!("must be > 0, got {}", curve.exponent),
                ));
            }
        }
        Ok(())
    }

    /// This policy if valid, otherwise the default policy
    pub fn or_default(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(err) => {
                tracing::warn!(%err, "invalid tolerance policy, using defaults");
                Self::default()
            }
        }
    }
}
