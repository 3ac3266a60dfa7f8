//! Engine option declarations and validation.
//!
//! Engines announce their options during the handshake with lines such as
//! `option name Hash type spin default 16 min 1 max 33554432`. The parsed
//! declarations form the engine's configuration map; values passed to
//! `set_option` are checked and normalized against it.

use crate::error::EngineError;

/// Type and bounds of a declared option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    Spin { default: i64, min: i64, max: i64 },
    Check { default: bool },
    Combo { default: String, vars: Vec<String> },
    Button,
    String { default: String },
}

/// A single declared option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOption {
    pub name: String,
    pub kind: OptionKind,
}

impl EngineOption {
    /// Normalize `value` for this option.
    ///
    /// Spin values are clamped into `[min, max]`, check values must be
    /// `true`/`false`, combo values must match a declared var.
    pub fn normalize(&self, value: &str) -> Result<String, EngineError> {
        let trimmed = value.trim();
        let invalid = || EngineError::InvalidOptionValue {
            name: self.name.clone(),
            value: value.to_string(),
        };
        match &self.kind {
            OptionKind::Spin { min, max, .. } => {
                let v = trimmed.parse::<i64>().map_err(|_| invalid())?;
                // Not `clamp`: bounds come from the engine and may be inverted.
                Ok(v.max(*min).min(*max).to_string())
            }
            OptionKind::Check { .. } => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok("true".to_string()),
                "false" | "0" => Ok("false".to_string()),
                _ => Err(invalid()),
            },
            OptionKind::Combo { vars, .. } => vars
                .iter()
                .find(|v| v.eq_ignore_ascii_case(trimmed))
                .cloned()
                .ok_or_else(invalid),
            OptionKind::Button => Ok(String::new()),
            OptionKind::String { .. } => Ok(value.to_string()),
        }
    }
}

/// Options declared by an engine, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsMap {
    options: Vec<EngineOption>,
}

impl OptionsMap {
    #[must_use]
    pub fn new() -> Self {
        OptionsMap::default()
    }

    /// Add or replace a declaration
    pub fn insert(&mut self, option: EngineOption) {
        match self.position(&option.name) {
            Some(i) => self.options[i] = option,
            None => self.options.push(option),
        }
    }

    /// Look up an option; UCI option names are case-insensitive
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EngineOption> {
        self.position(name).map(|i| &self.options[i])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineOption> {
        self.options.iter()
    }

    /// Validate a `setoption` request, returning the declared name and the
    /// normalized value.
    pub fn validate(&self, name: &str, value: &str) -> Result<(String, String), EngineError> {
        let option = self.get(name).ok_or_else(|| EngineError::UnknownOption {
            name: name.trim().to_string(),
        })?;
        let value = option.normalize(value)?;
        Ok((option.name.clone(), value))
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.options
            .iter()
            .position(|o| o.name.eq_ignore_ascii_case(name))
    }
}

/// Parse an `option name <name> type <type> ...` line.
///
/// Names and string defaults may contain spaces. `<empty>` denotes an empty
/// string default.
#[must_use]
pub fn parse_option_declaration(line: &str) -> Option<EngineOption> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"option") {
        return None;
    }

    let mut name_parts: Vec<&str> = Vec::new();
    let mut type_name = "";
    let mut default_parts: Vec<&str> = Vec::new();
    let mut min = None;
    let mut max = None;
    let mut vars: Vec<String> = Vec::new();
    let mut var_parts: Vec<&str> = Vec::new();
    let mut mode = "";

    for part in parts.iter().skip(1) {
        match *part {
            "name" if mode != "default" && mode != "var" => mode = "name",
            "type" if mode == "name" => mode = "type",
            "default" if !type_name.is_empty() => mode = "default",
            "min" if type_name == "spin" => mode = "min",
            "max" if type_name == "spin" => mode = "max",
            "var" if type_name == "combo" => {
                if !var_parts.is_empty() {
                    vars.push(var_parts.join(" "));
                    var_parts.clear();
                }
                mode = "var";
            }
            _ => match mode {
                "name" => name_parts.push(part),
                "type" => type_name = part,
                "default" => default_parts.push(part),
                "min" => min = part.parse::<i64>().ok(),
                "max" => max = part.parse::<i64>().ok(),
                "var" => var_parts.push(part),
                _ => {}
            },
        }
    }
    if !var_parts.is_empty() {
        vars.push(var_parts.join(" "));
    }

    if name_parts.is_empty() {
        return None;
    }
    let default = default_parts.join(" ");
    let default = if default == "<empty>" { String::new() } else { default };

    let kind = match type_name {
        "spin" => {
            let d = default.parse::<i64>().ok()?;
            let (min, max) = (min.unwrap_or(i64::MIN), max.unwrap_or(i64::MAX));
            if min > max {
                return None;
            }
            OptionKind::Spin { default: d, min, max }
        }
        "check" => OptionKind::Check {
            default: default.eq_ignore_ascii_case("true"),
        },
        "combo" => OptionKind::Combo { default, vars },
        "button" => OptionKind::Button,
        "string" => OptionKind::String { default },
        _ => return None,
    };

    Some(EngineOption {
        name: name_parts.join(" "),
        kind,
    })
}
