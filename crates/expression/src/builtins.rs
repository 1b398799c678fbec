//! The filter/function registry (§4.2 "Filters").
//!
//! Grounded on the teacher's `builtins/{string,array,math,conversion}.rs`
//! dispatch-by-name shape, trimmed to the standard set §4.2 names: string
//! case conversion, truncation, numeric formatting, list length/slice, date
//! formatting, and `default`.

use prana_value::Value;
use std::collections::HashMap;

type Filter = fn(&[Value]) -> Result<Value, String>;

pub struct BuiltinRegistry {
    filters: HashMap<&'static str, Filter>,
}

impl BuiltinRegistry {
    #[must_use]
    pub fn standard() -> Self {
        let mut filters: HashMap<&'static str, Filter> = HashMap::new();
        filters.insert("upper", upper);
        filters.insert("lower", lower);
        filters.insert("capitalize", capitalize);
        filters.insert("trim", trim);
        filters.insert("truncate", truncate);
        filters.insert("length", length);
        filters.insert("first", first);
        filters.insert("last", last);
        filters.insert("slice", slice);
        filters.insert("round", round);
        filters.insert("number_format", number_format);
        filters.insert("date_format", date_format);
        filters.insert("default", default);
        Self { filters }
    }

    /// Registers or overrides a named filter.
    pub fn register(&mut self, name: &'static str, f: Filter) {
        self.filters.insert(name, f);
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, String> {
        let f = self.filters.get(name).ok_or_else(|| format!("unknown function '{name}'"))?;
        f(args)
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn arg_str(args: &[Value], i: usize, name: &str) -> Result<String, String> {
    args.get(i)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("'{name}' expects a string argument at position {i}"))
}

fn upper(args: &[Value]) -> Result<Value, String> {
    Ok(Value::string(arg_str(args, 0, "upper")?.to_uppercase()))
}

fn lower(args: &[Value]) -> Result<Value, String> {
    Ok(Value::string(arg_str(args, 0, "lower")?.to_lowercase()))
}

fn capitalize(args: &[Value]) -> Result<Value, String> {
    let s = arg_str(args, 0, "capitalize")?;
    let mut chars = s.chars();
    let out = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    };
    Ok(Value::string(out))
}

fn trim(args: &[Value]) -> Result<Value, String> {
    Ok(Value::string(arg_str(args, 0, "trim")?.trim().to_string()))
}

fn truncate(args: &[Value]) -> Result<Value, String> {
    let s = arg_str(args, 0, "truncate")?;
    let max = args.get(1).and_then(Value::as_i64).ok_or("'truncate' expects a length argument")? as usize;
    if s.chars().count() <= max {
        Ok(Value::string(s))
    } else {
        Ok(Value::string(s.chars().take(max).collect::<String>() + "…"))
    }
}

fn length(args: &[Value]) -> Result<Value, String> {
    match args.first() {
        Some(Value::String(s)) => Ok(Value::Int(s.chars().count() as i64)),
        Some(Value::List(l)) => Ok(Value::Int(l.len() as i64)),
        Some(Value::Map(m)) => Ok(Value::Int(m.len() as i64)),
        Some(Value::Null) | None => Ok(Value::Int(0)),
        Some(other) => Err(format!("'length' does not apply to {}", other.type_name())),
    }
}

fn first(args: &[Value]) -> Result<Value, String> {
    match args.first() {
        Some(Value::List(l)) => Ok(l.first().cloned().unwrap_or(Value::Null)),
        Some(other) => Err(format!("'first' expects a list, found {}", other.type_name())),
        None => Err("'first' expects one argument".into()),
    }
}

fn last(args: &[Value]) -> Result<Value, String> {
    match args.first() {
        Some(Value::List(l)) => Ok(l.last().cloned().unwrap_or(Value::Null)),
        Some(other) => Err(format!("'last' expects a list, found {}", other.type_name())),
        None => Err("'last' expects one argument".into()),
    }
}

fn slice(args: &[Value]) -> Result<Value, String> {
    let Some(Value::List(l)) = args.first() else {
        return Err("'slice' expects a list as its first argument".into());
    };
    let start = args.get(1).and_then(Value::as_i64).unwrap_or(0).max(0) as usize;
    let end = args.get(2).and_then(Value::as_i64).map_or(l.len(), |n| (n.max(0) as usize).min(l.len()));
    if start >= end || start >= l.len() {
        return Ok(Value::List(Vec::new()));
    }
    Ok(Value::List(l[start..end].to_vec()))
}

fn round(args: &[Value]) -> Result<Value, String> {
    let n = args.first().and_then(Value::as_f64).ok_or("'round' expects a numeric argument")?;
    let digits = args.get(1).and_then(Value::as_i64).unwrap_or(0).max(0) as i32;
    let factor = 10f64.powi(digits);
    Ok(Value::Float((n * factor).round() / factor))
}

fn number_format(args: &[Value]) -> Result<Value, String> {
    let n = args.first().and_then(Value::as_f64).ok_or("'number_format' expects a numeric argument")?;
    let digits = args.get(1).and_then(Value::as_i64).unwrap_or(2).max(0) as usize;
    Ok(Value::string(format!("{n:.digits$}")))
}

fn date_format(args: &[Value]) -> Result<Value, String> {
    let ts = arg_str(args, 0, "date_format")?;
    let fmt = args.get(1).and_then(Value::as_str).unwrap_or("%Y-%m-%d");
    let parsed = chrono::DateTime::parse_from_rfc3339(&ts).map_err(|e| format!("'date_format': {e}"))?;
    Ok(Value::string(parsed.format(fmt).to_string()))
}

/// `value | default(fallback)`: the filter proper receives `[value,
/// fallback]` once the pipe is desugared.
fn default(args: &[Value]) -> Result<Value, String> {
    let value = args.first().ok_or("'default' expects a value argument")?;
    let fallback = args.get(1).ok_or("'default' expects a fallback argument")?;
    if value.is_null() {
        Ok(fallback.clone())
    } else {
        Ok(value.clone())
    }
}
