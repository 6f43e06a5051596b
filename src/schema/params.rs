use crate::foundation::error::{FxError, FxResult};
use crate::schema::validate::validate_params;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Host-supplied parameter values keyed by name.
pub type ParamValues = serde_json::Map<String, Value>;

/// Value type of one stage parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Finite number, optionally bounded and stepped.
    Number,
    /// Boolean toggle.
    Boolean,
    /// Free text.
    String,
    /// `#rrggbb` color.
    Color,
    /// One of a fixed list of options.
    Select,
}

/// Declaration of one stage parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, unique within a schema.
    pub name: String,
    /// Value type.
    #[serde(rename = "type")]
    pub kind: ParamKind,
    /// Value used when the host supplies nothing usable.
    pub default: Value,
    /// Lower bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Snap increment for numbers, measured from `min` (or zero).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Choices for selects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ParamSpec {
    /// Bounded number parameter.
    pub fn number(name: impl Into<String>, default: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Number,
            default: Value::from(default),
            min: Some(min),
            max: Some(max),
            step: None,
            options: Vec::new(),
        }
    }

    /// Return this parameter with a snap increment.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Boolean parameter.
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self::plain(name, ParamKind::Boolean, Value::Bool(default))
    }

    /// Color parameter with a `#rrggbb` default.
    pub fn color(name: impl Into<String>, default: &str) -> Self {
        Self::plain(name, ParamKind::Color, Value::from(default))
    }

    /// Select parameter.
    pub fn select<I, S>(name: impl Into<String>, default: &str, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut p = Self::plain(name, ParamKind::Select, Value::from(default));
        p.options = options.into_iter().map(Into::into).collect();
        p
    }

    fn plain(name: impl Into<String>, kind: ParamKind, default: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
            min: None,
            max: None,
            step: None,
            options: Vec::new(),
        }
    }

    fn clamp_number(&self, v: f64) -> f64 {
        let mut v = v;
        if let Some(step) = self.step
            && step > 0.0
        {
            let base = self.min.unwrap_or(0.0);
            v = base + ((v - base) / step).round() * step;
        }
        if let Some(min) = self.min {
            v = v.max(min);
        }
        if let Some(max) = self.max {
            v = v.min(max);
        }
        v
    }
}

/// Ordered parameter list a stage exposes to its host.
///
/// The core never reads raw host values directly: every value goes through one of the
/// `resolve_*` methods, which fall back to the declared default and clamp numbers into range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSchema {
    params: Vec<ParamSpec>,
}

impl ParamSchema {
    /// Build and validate a schema.
    pub fn new(params: Vec<ParamSpec>) -> FxResult<Self> {
        let schema = Self { params };
        schema.validate()?;
        Ok(schema)
    }

    /// Parse and validate a schema from a JSON array.
    pub fn from_json(s: &str) -> FxResult<Self> {
        let params: Vec<ParamSpec> = serde_json::from_str(s)
            .map_err(|e| FxError::validation(format!("parse param schema JSON: {e}")))?;
        Self::new(params)
    }

    /// Check defaults, bounds and option lists.
    pub fn validate(&self) -> FxResult<()> {
        validate_params(&self.params).map_err(|issues| {
            let lines: Vec<String> = issues.iter().map(ToString::to_string).collect();
            FxError::validation(format!("invalid param schema: {}", lines.join("; ")))
        })
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Defaults for every parameter.
    pub fn defaults(&self) -> ParamValues {
        self.params
            .iter()
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect()
    }

    /// Resolve a number: host value or default, snapped to `step` and clamped to `[min, max]`.
    pub fn resolve_number(&self, name: &str, values: &ParamValues) -> FxResult<f64> {
        let spec = self.expect(name, ParamKind::Number)?;
        let v = values
            .get(name)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .or_else(|| spec.default.as_f64())
            .unwrap_or(0.0);
        Ok(spec.clamp_number(v))
    }

    /// Resolve a boolean.
    pub fn resolve_bool(&self, name: &str, values: &ParamValues) -> FxResult<bool> {
        let spec = self.expect(name, ParamKind::Boolean)?;
        Ok(values
            .get(name)
            .and_then(Value::as_bool)
            .or_else(|| spec.default.as_bool())
            .unwrap_or(false))
    }

    /// Resolve a string.
    pub fn resolve_string<'v>(&'v self, name: &str, values: &'v ParamValues) -> FxResult<&'v str> {
        let spec = self.expect(name, ParamKind::String)?;
        Ok(values
            .get(name)
            .and_then(Value::as_str)
            .or_else(|| spec.default.as_str())
            .unwrap_or(""))
    }

    /// Resolve a color to linear `[0, 1]` channels. Unparseable host values use the default.
    pub fn resolve_color(&self, name: &str, values: &ParamValues) -> FxResult<[f32; 3]> {
        let spec = self.expect(name, ParamKind::Color)?;
        if let Some(rgb) = values
            .get(name)
            .and_then(Value::as_str)
            .and_then(|s| parse_hex_rgb(s).ok())
        {
            return Ok(rgb);
        }
        let default = spec.default.as_str().unwrap_or_default();
        parse_hex_rgb(default).map_err(FxError::validation)
    }

    /// Resolve a select. Values outside the option list use the default.
    pub fn resolve_select<'v>(&'v self, name: &str, values: &'v ParamValues) -> FxResult<&'v str> {
        let spec = self.expect(name, ParamKind::Select)?;
        let chosen = values
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| spec.options.iter().any(|o| o == s));
        Ok(chosen.or_else(|| spec.default.as_str()).unwrap_or_default())
    }

    fn expect(&self, name: &str, kind: ParamKind) -> FxResult<&ParamSpec> {
        let spec = self
            .get(name)
            .ok_or_else(|| FxError::validation(format!("unknown param \"{name}\"")))?;
        if spec.kind != kind {
            return Err(FxError::validation(format!(
                "param \"{name}\" is {:?}, not {kind:?}",
                spec.kind
            )));
        }
        Ok(spec)
    }
}

/// Parse `#rrggbb` (hash optional) into `[0, 1]` channels.
pub(crate) fn parse_hex_rgb(s: &str) -> Result<[f32; 3], String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);
    if s.len() != 6 || !s.is_ascii() {
        return Err(format!("hex color must be #RRGGBB, got \"{s}\""));
    }

    fn hex_byte(pair: &str) -> Result<f32, String> {
        u8::from_str_radix(pair, 16)
            .map(|b| f32::from(b) / 255.0)
            .map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    Ok([
        hex_byte(&s[0..2])?,
        hex_byte(&s[2..4])?,
        hex_byte(&s[4..6])?,
    ])
}

#[cfg(test)]
#[path = "../../tests/unit/schema/params.rs"]
mod tests;
