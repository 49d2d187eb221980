//! Pin list expansion.
//!
//! Connection entries address pins with a compact range syntax:
//!
//! ```text
//! pinlist := item ("," item)*
//! item    := pin | pin "-" pin
//! pin     := [0-9]+            (1 to MAX_PIN)
//! ```
//!
//! Whitespace around items and bounds is ignored. A range `a-b` requires
//! `a <= b` and expands to every pin from `a` to `b`. A pin may appear only
//! once in a list. The same rules apply when the list is written as a YAML
//! sequence whose elements are pins or range strings.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde_yaml::Value;

use crate::error::{Error, Result};

/// One-based pin (or wire) number.
pub type Pin = u32;

/// Highest pin number accepted in a pin list.
pub const MAX_PIN: Pin = 10_000;

/// Expand a range string such as `"1-3,6"` into `[1, 2, 3, 6]`.
pub fn expand(input: &str) -> Result<Vec<Pin>> {
    let mut pins = PinList::new(input);
    pins.push_str(input)?;
    Ok(pins.into_vec())
}

/// Expand a pin list given as a YAML scalar or sequence.
pub fn expand_value(value: &Value) -> Result<Vec<Pin>> {
    let display = render(value);
    let mut pins = PinList::new(&display);
    match value {
        Value::Sequence(items) => {
            for item in items {
                pins.push_scalar(item)?;
            }
        }
        other => pins.push_scalar(other)?,
    }
    Ok(pins.into_vec())
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
    }
}

struct PinList {
    input: String,
    pins: Vec<Pin>,
    seen: HashSet<Pin>,
}

impl PinList {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_owned(),
            pins: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn into_vec(self) -> Vec<Pin> {
        self.pins
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::InvalidPinList {
            input: self.input.clone(),
            reason: reason.into(),
        }
    }

    fn push_scalar(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::String(s) => self.push_str(s),
            Value::Number(n) => {
                let pin = n
                    .as_u64()
                    .ok_or_else(|| self.error(format!("`{n}` is not a pin number")))?;
                let pin = self.check_bounds(pin, &n.to_string())?;
                self.push_range(pin..=pin)
            }
            other => Err(self.error(format!("unexpected value {}", render(other)))),
        }
    }

    fn push_str(&mut self, list: &str) -> Result<()> {
        for item in list.split(',') {
            let range = self.parse_item(item)?;
            self.push_range(range)?;
        }
        Ok(())
    }

    fn push_range(&mut self, range: RangeInclusive<Pin>) -> Result<()> {
        for pin in range {
            if !self.seen.insert(pin) {
                return Err(self.error(format!("pin {pin} is listed more than once")));
            }
            self.pins.push(pin);
        }
        Ok(())
    }

    fn parse_item(&self, item: &str) -> Result<RangeInclusive<Pin>> {
        let item = item.trim();
        if item.is_empty() {
            return Err(self.error("empty item"));
        }
        match item.split_once('-') {
            Some((start, end)) => {
                let start = self.parse_pin(start)?;
                let end = self.parse_pin(end)?;
                if start > end {
                    return Err(self.error(format!("descending range `{item}`")));
                }
                Ok(start..=end)
            }
            None => {
                let pin = self.parse_pin(item)?;
                Ok(pin..=pin)
            }
        }
    }

    fn parse_pin(&self, text: &str) -> Result<Pin> {
        let text = text.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.error(format!("`{text}` is not a pin number")));
        }
        match text.parse::<u64>() {
            Ok(pin) => self.check_bounds(pin, text),
            Err(_) => Err(self.error(format!("pin `{text}` is out of range"))),
        }
    }

    fn check_bounds(&self, pin: u64, text: &str) -> Result<Pin> {
        match Pin::try_from(pin) {
            Ok(0) => Err(self.error("pins are numbered from 1")),
            Ok(pin) if pin <= MAX_PIN => Ok(pin),
            _ => Err(self.error(format!("pin `{text}` is above {MAX_PIN}"))),
        }
    }
}
