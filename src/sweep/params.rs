//! Tracer parameter catalogue and parameter-file rendering.
//!
//! The tracer reads a flat `key<TAB>value` file with a fixed key set in a
//! fixed order. Every numeric key can be swept; the two boolean keys are
//! fixed for a whole sweep.

use std::fmt;

use super::decimal::Decimal;

/// Default value of a catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDefault {
    Number(&'static str),
    Flag(bool),
}

/// One tracer parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub default: ParamDefault,
}

const fn number(key: &'static str, default: &'static str) -> ParamSpec {
    ParamSpec {
        key,
        default: ParamDefault::Number(default),
    }
}

const fn flag(key: &'static str, default: bool) -> ParamSpec {
    ParamSpec {
        key,
        default: ParamDefault::Flag(default),
    }
}

/// All tracer parameters, in parameter-file order.
pub static PARAMETERS: [ParamSpec; 26] = [
    number("intensity-scaling", "0"),
    number("gaussian-std", "0"),
    number("ridge-threshold", "0.01"),
    number("maximum-foreground", "65535"),
    number("minimum-foreground", "10"),
    flag("init-z", true),
    number("snake-point-spacing", "5"),
    number("minimum-snake-length", "20"),
    number("maximum-iterations", "10000"),
    number("change-threshold", "0.1"),
    number("check-period", "100"),
    number("alpha", "0.01"),
    number("beta", "0.1"),
    number("gamma", "2"),
    number("external-factor", "1"),
    number("stretch-factor", "0.2"),
    number("number-of-background-radial-sectors", "8"),
    number("background-z-xy-ratio", "2.88"),
    number("radial-near", "4"),
    number("radial-far", "8"),
    number("delta", "4"),
    number("overlap-threshold", "1"),
    number("grouping-distance-threshold", "4"),
    number("grouping-delta", "8"),
    number("minimum-angle-for-soac-linking", "2.1"),
    flag("damp-z", false),
];

pub fn lookup(key: &str) -> Option<&'static ParamSpec> {
    PARAMETERS.iter().find(|spec| spec.key == key)
}

/// Resolved value of one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Number(Decimal),
    Flag(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(value) => write!(f, "{value}"),
            ParamValue::Flag(value) => write!(f, "{value}"),
        }
    }
}

/// One combination of the sweep: a value for every catalogue key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    name: String,
    entries: Vec<(&'static str, ParamValue)>,
}

impl ParameterSet {
    pub(crate) fn new(name: String, entries: Vec<(&'static str, ParamValue)>) -> Self {
        Self { name, entries }
    }

    /// Stem of the parameter file; also names the job's output directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> String {
        format!("{}.txt", self.name)
    }

    pub fn entries(&self) -> &[(&'static str, ParamValue)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| value)
    }

    /// Parameter-file contents: one `key<TAB>value` line per entry.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push('\t');
            out.push_str(&value.to_string());
            out.push('\n');
        }
        out
    }
}
