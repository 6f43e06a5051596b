use crate::schema::params::{ParamKind, ParamSpec, parse_hex_rgb};
use std::collections::HashSet;
use std::fmt;

/// A problem with one declared parameter, located as `$[index]` or `$[index].field`.
#[derive(Debug, Clone)]
pub(crate) struct ParamIssue {
    pub(crate) index: usize,
    pub(crate) field: Option<&'static str>,
    pub(crate) message: String,
}

impl fmt::Display for ParamIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$[{}]", self.index)?;
        if let Some(field) = self.field {
            write!(f, ".{field}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Check every declared parameter, collecting all issues rather than stopping at the first.
pub(crate) fn validate_params(params: &[ParamSpec]) -> Result<(), Vec<ParamIssue>> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for (index, p) in params.iter().enumerate() {
        let mut report = |field: Option<&'static str>, message: String| {
            issues.push(ParamIssue {
                index,
                field,
                message,
            });
        };
        if p.name.trim().is_empty() {
            report(None, "param name must be non-empty".to_owned());
        } else if !seen.insert(p.name.as_str()) {
            report(None, format!("duplicate param name \"{}\"", p.name));
        }
        validate_param(p, |field, message| report(Some(field), message));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn validate_param(p: &ParamSpec, mut issue: impl FnMut(&'static str, String)) {
    match p.kind {
        ParamKind::Number => {
            if !p.default.as_f64().is_some_and(f64::is_finite) {
                issue("default", "must be finite".to_owned());
            }
            for (name, v) in [("min", p.min), ("max", p.max)] {
                if v.is_some_and(|v| !v.is_finite()) {
                    issue(name, "must be finite".to_owned());
                }
            }
            if let (Some(min), Some(max)) = (p.min, p.max)
                && min > max
            {
                issue("max", "must be >= min".to_owned());
            }
            if let Some(step) = p.step
                && !(step.is_finite() && step > 0.0)
            {
                issue("step", "must be > 0".to_owned());
            }
        }
        ParamKind::Boolean => {
            if !p.default.is_boolean() {
                issue("default", "must be a boolean".to_owned());
            }
        }
        ParamKind::String => {
            if !p.default.is_string() {
                issue("default", "must be a string".to_owned());
            }
        }
        ParamKind::Color => match p.default.as_str() {
            Some(s) => {
                if let Err(e) = parse_hex_rgb(s) {
                    issue("default", e);
                }
            }
            None => issue("default", "must be a hex color".to_owned()),
        },
        ParamKind::Select => {
            if p.options.is_empty() {
                issue("options", "must be non-empty".to_owned());
            }
            match p.default.as_str() {
                Some(s) if p.options.iter().any(|o| o == s) => {}
                _ => issue("default", "must be an option".to_owned()),
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schema/validate.rs"]
mod tests;
