//! The genetic material payload.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    hash::{Hash, Hasher},
};

/// An evolvable value. Its shape always mirrors the
/// [ParamSpec](crate::spec::ParamSpec) tree that governs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Material {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Material>),
    Dict(BTreeMap<String, Material>),
}

impl Material {
    pub fn type_name(&self) -> &'static str {
        match self {
            Material::Null => "null",
            Material::Bool(_) => "boolean",
            Material::Int(_) => "integer",
            Material::Float(_) => "float",
            Material::Str(_) => "string",
            Material::List(_) => "list",
            Material::Dict(_) => "dictionary",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Material::Null)
    }

    /// Numeric view; integers widen to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Material::Float(v) => Some(*v),
            Material::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Material::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Material::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Material::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Material]> {
        match self {
            Material::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, Material>> {
        match self {
            Material::Dict(v) => Some(v),
            _ => None,
        }
    }

    /// Direct conversion from a parsed JSON value, without a serde round trip.
    pub fn from_json(value: &serde_json::Value) -> Material {
        match value {
            serde_json::Value::Null => Material::Null,
            serde_json::Value::Bool(b) => Material::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Material::Int(i),
                None => Material::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Material::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Material::List(items.iter().map(Material::from_json).collect())
            }
            serde_json::Value::Object(fields) => Material::Dict(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Material::from_json(v)))
                    .collect(),
            ),
        }
    }
}

// Floats compare and hash by bit pattern so material can live in
// de-duplicating collections. NaN == NaN here, on purpose.
impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Material::Null, Material::Null) => true,
            (Material::Bool(l), Material::Bool(r)) => l == r,
            (Material::Int(l), Material::Int(r)) => l == r,
            (Material::Float(l), Material::Float(r)) => l.to_bits() == r.to_bits(),
            (Material::Str(l), Material::Str(r)) => l == r,
            (Material::List(l), Material::List(r)) => l == r,
            (Material::Dict(l), Material::Dict(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for Material {}

impl Hash for Material {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Material::Null => {}
            Material::Bool(v) => v.hash(state),
            Material::Int(v) => v.hash(state),
            Material::Float(v) => v.to_bits().hash(state),
            Material::Str(v) => v.hash(state),
            Material::List(v) => v.hash(state),
            Material::Dict(v) => v.hash(state),
        }
    }
}

impl From<bool> for Material {
    fn from(v: bool) -> Self {
        Material::Bool(v)
    }
}

impl From<i64> for Material {
    fn from(v: i64) -> Self {
        Material::Int(v)
    }
}

impl From<f64> for Material {
    fn from(v: f64) -> Self {
        Material::Float(v)
    }
}

impl From<&str> for Material {
    fn from(v: &str) -> Self {
        Material::Str(v.into())
    }
}

impl From<String> for Material {
    fn from(v: String) -> Self {
        Material::Str(v)
    }
}

impl From<Vec<Material>> for Material {
    fn from(v: Vec<Material>) -> Self {
        Material::List(v)
    }
}

impl From<BTreeMap<String, Material>> for Material {
    fn from(v: BTreeMap<String, Material>) -> Self {
        Material::Dict(v)
    }
}
