//! Interpret a JSON-shaped schema description into a [ParamSpec] tree.
//! Recognized type keywords: `double`/`float`, `int`/`integer`, `boolean`,
//! `string` ( with `choice` ), `list`, `dict`, `tuple`, `void`.

use super::{ClampMode, NumberKind, NumberSpec, ParamSpec, ScalingRegistry};
use crate::material::Material;
use core::error::Error;
use log::warn;
use serde_json::Value;

/// What to do with a field whose type keyword is not recognized: refuse the
/// whole schema, or log and treat the field as not evolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Strict,
    Lenient,
}

pub fn parse_schema(
    description: &Value,
    mode: ParseMode,
    scalings: &ScalingRegistry,
) -> Result<ParamSpec, Box<dyn Error>> {
    let root = description
        .as_object()
        .ok_or("schema description must be an object")?;

    let spec = parse_fields(root, mode)?;
    spec.validate(scalings)?;
    Ok(spec)
}

fn parse_fields(
    fields: &serde_json::Map<String, Value>,
    mode: ParseMode,
) -> Result<ParamSpec, Box<dyn Error>> {
    let change_rate = match fields.get("fieldChangeRate") {
        Some(v) => v
            .as_f64()
            .ok_or_else(|| format!("fieldChangeRate must be a number, got {v}"))?,
        None => 1.0,
    };

    let mut parsed = Vec::with_capacity(fields.len());
    for (name, node) in fields {
        if name == "fieldChangeRate" {
            continue;
        }
        parsed.push((name.clone(), parse_node(name, node, mode)?));
    }

    Ok(ParamSpec::Structure {
        fields: parsed,
        change_rate,
    })
}

fn parse_node(name: &str, node: &Value, mode: ParseMode) -> Result<ParamSpec, Box<dyn Error>> {
    let node = node
        .as_object()
        .ok_or_else(|| format!("field {name:?}: expected an object, got {node}"))?;

    let type_val = node
        .get("type")
        .ok_or_else(|| format!("field {name:?}: missing type"))?;

    // an object in the type position is a dictionary branch
    if let Some(nested) = type_val.as_object() {
        let mut with_rate = nested.clone();
        if let Some(rate) = node.get("fieldChangeRate") {
            with_rate.insert("fieldChangeRate".into(), rate.clone());
        }
        return parse_fields(&with_rate, mode);
    }

    let keyword = type_val
        .as_str()
        .ok_or_else(|| format!("field {name:?}: type must be a keyword or object"))?;

    match keyword {
        "double" | "float" => parse_number(name, node, NumberKind::Float),
        "int" | "integer" => parse_number(name, node, NumberKind::Int),
        "boolean" => Ok(ParamSpec::Boolean),
        "string" => parse_choices(node)?
            .map(|choices| ParamSpec::ValueSet { choices })
            .ok_or_else(|| format!("field {name:?}: string type requires a choice array").into()),
        "list" => parse_list(name, node, mode),
        "dict" => {
            let fields = node
                .get("fields")
                .and_then(Value::as_object)
                .ok_or_else(|| format!("field {name:?}: dict type requires a fields object"))?;
            let mut with_rate = fields.clone();
            if let Some(rate) = node.get("fieldChangeRate") {
                with_rate.insert("fieldChangeRate".into(), rate.clone());
            }
            parse_fields(&with_rate, mode)
        }
        "tuple" => parse_tuple(name, node, mode),
        "void" => Ok(ParamSpec::Void),
        other => match mode {
            ParseMode::Strict => {
                Err(format!("field {name:?}: unrecognized type keyword {other:?}").into())
            }
            ParseMode::Lenient => {
                warn!("field {name:?}: unrecognized type keyword {other:?}, treating as void");
                Ok(ParamSpec::Void)
            }
        },
    }
}

fn parse_number(
    name: &str,
    node: &serde_json::Map<String, Value>,
    kind: NumberKind,
) -> Result<ParamSpec, Box<dyn Error>> {
    // a finite choice set wins over a range
    if let Some(choices) = parse_choices(node)? {
        return Ok(ParamSpec::ValueSet { choices });
    }

    let bound = |key: &str| {
        node.get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| format!("field {name:?}: missing numeric {key}"))
    };

    Ok(ParamSpec::Number(NumberSpec {
        lower: bound("lowerBound")?,
        upper: bound("upperBound")?,
        precision: node.get("precision").and_then(Value::as_f64),
        scaling: node
            .get("scaling")
            .and_then(Value::as_str)
            .unwrap_or("linear")
            .into(),
        kind,
        clamp: match node.get("clamp").and_then(Value::as_bool) {
            Some(true) => ClampMode::Clamp,
            _ => ClampMode::Unbounded,
        },
    }))
}

fn parse_choices(
    node: &serde_json::Map<String, Value>,
) -> Result<Option<Vec<Material>>, Box<dyn Error>> {
    match node.get("choice") {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.iter().map(Material::from_json).collect())),
        Some(other) => Err(format!("choice must be an array, got {other}").into()),
    }
}

fn parse_list(
    name: &str,
    node: &serde_json::Map<String, Value>,
    mode: ParseMode,
) -> Result<ParamSpec, Box<dyn Error>> {
    let component = node
        .get("component")
        .ok_or_else(|| format!("field {name:?}: list type requires a component spec"))?;
    let component = parse_node(&format!("{name}[]"), component, mode)?;

    let length = |key: &str| {
        node.get(key).map(|v| {
            v.as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| format!("field {name:?}: {key} must be a non-negative integer"))
        })
    };

    let (min_len, max_len) = match (
        length("length").transpose()?,
        length("minLength").transpose()?,
        length("maxLength").transpose()?,
    ) {
        (Some(n), None, None) => (n, n),
        (None, Some(lo), Some(hi)) => (lo, hi),
        (None, None, Some(hi)) => (0, hi),
        _ => return Err(format!("field {name:?}: list needs length or min/maxLength").into()),
    };

    Ok(ParamSpec::List {
        component: Box::new(component),
        min_len,
        max_len,
        change_rate: node
            .get("componentChangeRate")
            .or_else(|| node.get("fieldChangeRate"))
            .and_then(Value::as_f64)
            .unwrap_or(1.0),
    })
}

fn parse_tuple(
    name: &str,
    node: &serde_json::Map<String, Value>,
    mode: ParseMode,
) -> Result<ParamSpec, Box<dyn Error>> {
    let components = node
        .get("components")
        .and_then(Value::as_array)
        .ok_or_else(|| format!("field {name:?}: tuple type requires a components array"))?;

    let fields = components
        .iter()
        .enumerate()
        .map(|(idx, component)| {
            parse_node(&format!("{name}.{idx}"), component, mode).map(|s| (idx.to_string(), s))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParamSpec::Structure {
        fields,
        change_rate: 1.0,
    })
}
