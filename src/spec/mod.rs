//! Declarative description of the evolutionary boundaries of genetic
//! material.

pub mod parse;
pub mod scaling;

pub use parse::{parse_schema, ParseMode};
pub use scaling::{ScalingFns, ScalingRegistry};

use crate::material::Material;
use core::error::Error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberKind {
    Float,
    Int,
}

/// What the gaussian mutator does when a perturbed value leaves the
/// declared range. Clamping is opt-in per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClampMode {
    Unbounded,
    Clamp,
}

/// Boundaries of a number evolved on a range, in unscaled space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberSpec {
    pub lower: f64,
    pub upper: f64,
    /// Gaussian sigma in scaled space. Defaults to 5% of the scaled range.
    pub precision: Option<f64>,
    /// Name of a [ScalingRegistry] entry.
    pub scaling: String,
    pub kind: NumberKind,
    pub clamp: ClampMode,
}

impl NumberSpec {
    pub fn ranged(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            precision: None,
            scaling: "linear".into(),
            kind: NumberKind::Float,
            clamp: ClampMode::Unbounded,
        }
    }

    pub fn int_ranged(lower: i64, upper: i64) -> Self {
        Self {
            kind: NumberKind::Int,
            ..Self::ranged(lower as f64, upper as f64)
        }
    }

    pub fn with_clamp(mut self) -> Self {
        self.clamp = ClampMode::Clamp;
        self
    }
}

/// One node in a spec tree. The tree's shape exactly mirrors the shape of
/// the material it governs: primitive leaves, list and structure branches,
/// [ParamSpec::Void] for fields declared but excluded from evolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParamSpec {
    Number(NumberSpec),
    Boolean,
    ValueSet {
        choices: Vec<Material>,
    },
    List {
        component: Box<ParamSpec>,
        min_len: usize,
        max_len: usize,
        change_rate: f64,
    },
    Structure {
        fields: Vec<(String, ParamSpec)>,
        change_rate: f64,
    },
    Void,
}

impl ParamSpec {
    /// Type tag of the material this spec produces.
    pub fn data_class(&self) -> &'static str {
        match self {
            ParamSpec::Number(NumberSpec {
                kind: NumberKind::Float,
                ..
            }) => "double",
            ParamSpec::Number(_) => "int",
            ParamSpec::Boolean => "boolean",
            ParamSpec::ValueSet { .. } => "set",
            ParamSpec::List { .. } => "list",
            ParamSpec::Structure { .. } => "dict",
            ParamSpec::Void => "void",
        }
    }

    pub fn structure(fields: Vec<(String, ParamSpec)>) -> Self {
        ParamSpec::Structure {
            fields,
            change_rate: 1.0,
        }
    }

    pub fn list(component: ParamSpec, min_len: usize, max_len: usize) -> Self {
        ParamSpec::List {
            component: Box::new(component),
            min_len,
            max_len,
            change_rate: 1.0,
        }
    }

    /// Check the whole tree against its constraints and the scaling
    /// registry, before any suite is built.
    pub fn validate(&self, scalings: &ScalingRegistry) -> Result<(), Box<dyn Error>> {
        match self {
            ParamSpec::Number(n) => {
                if !n.lower.is_finite() || !n.upper.is_finite() || n.lower > n.upper {
                    return Err(format!("bad number range [{}, {}]", n.lower, n.upper).into());
                }
                if n.precision.is_some_and(|p| !(p > 0.0)) {
                    return Err(format!("precision must be positive: {:?}", n.precision).into());
                }
                if scalings.get(&n.scaling).is_none() {
                    return Err(format!("unknown scaling function {:?}", n.scaling).into());
                }
                Ok(())
            }
            ParamSpec::ValueSet { choices } => {
                if choices.is_empty() {
                    Err("value set with no choices".into())
                } else {
                    Ok(())
                }
            }
            ParamSpec::List {
                component,
                min_len,
                max_len,
                change_rate,
            } => {
                if min_len > max_len {
                    return Err(format!("bad length bounds [{min_len}, {max_len}]").into());
                }
                if !(0.0..=1.0).contains(change_rate) {
                    return Err(format!("change rate {change_rate} outside [0, 1]").into());
                }
                component.validate(scalings)
            }
            ParamSpec::Structure {
                fields,
                change_rate,
            } => {
                if !(0.0..=1.0).contains(change_rate) {
                    return Err(format!("change rate {change_rate} outside [0, 1]").into());
                }
                for (name, field) in fields {
                    field
                        .validate(scalings)
                        .map_err(|e| format!("field {name:?}: {e}"))?;
                }
                Ok(())
            }
            ParamSpec::Boolean | ParamSpec::Void => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate_catches_bad_range() {
        let scalings = ScalingRegistry::default();
        let spec = ParamSpec::Number(NumberSpec::ranged(2.0, 1.0));
        assert!(spec.validate(&scalings).is_err());
    }

    #[test]
    fn test_validate_unknown_scaling() {
        let scalings = ScalingRegistry::default();
        let mut n = NumberSpec::ranged(0.0, 1.0);
        n.scaling = "cubic".into();
        assert!(ParamSpec::Number(n).validate(&scalings).is_err());
    }

    #[test]
    fn test_validate_names_offending_field() {
        let scalings = ScalingRegistry::default();
        let spec = ParamSpec::structure(vec![
            ("ok".into(), ParamSpec::Boolean),
            ("bad".into(), ParamSpec::ValueSet { choices: vec![] }),
        ]);
        let err = spec.validate(&scalings).unwrap_err().to_string();
        assert!(err.contains("bad"), "{err}");
    }

    #[test]
    fn test_validate_nested_ok() {
        let scalings = ScalingRegistry::default();
        let spec = ParamSpec::structure(vec![
            ("w".into(), ParamSpec::Number(NumberSpec::ranged(-1.0, 1.0))),
            (
                "tags".into(),
                ParamSpec::list(
                    ParamSpec::ValueSet {
                        choices: vec!["a".into(), "b".into()],
                    },
                    0,
                    4,
                ),
            ),
            ("skip".into(), ParamSpec::Void),
        ]);
        assert!(spec.validate(&scalings).is_ok());
    }
}
