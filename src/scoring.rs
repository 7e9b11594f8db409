//! Per-field risk scores.
//!
//! Each function reads one raw JSON field and never fails: absent, null, or
//! unparsable input comes back as [`ScoreResult::invalid`].

use serde_json::Value;

pub const FEVER_THRESHOLD_F: f64 = 99.6;
pub const HIGH_FEVER_THRESHOLD_F: f64 = 101.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreResult {
    pub score: u32,
    pub is_invalid: bool,
}

impl ScoreResult {
    pub fn valid(score: u32) -> Self {
        Self {
            score,
            is_invalid: false,
        }
    }

    pub fn invalid() -> Self {
        Self {
            score: 0,
            is_invalid: true,
        }
    }

    /// Contribution to the total risk; invalid results count as zero.
    pub fn effective_score(&self) -> u32 {
        if self.is_invalid { 0 } else { self.score }
    }
}

pub fn bp_risk(raw: Option<&Value>) -> ScoreResult {
    let Some((systolic, diastolic)) = raw.and_then(parse_blood_pressure) else {
        return ScoreResult::invalid();
    };

    let score = if systolic >= 140 || diastolic >= 90 {
        3
    } else if (130..=139).contains(&systolic) || (80..=89).contains(&diastolic) {
        2
    } else if (120..=129).contains(&systolic) && diastolic < 80 {
        1
    } else {
        0
    };
    ScoreResult::valid(score)
}

pub fn temperature_risk(raw: Option<&Value>) -> ScoreResult {
    let Some(temperature) = raw.and_then(parse_temperature) else {
        return ScoreResult::invalid();
    };

    let score = if temperature >= HIGH_FEVER_THRESHOLD_F {
        2
    } else if temperature >= FEVER_THRESHOLD_F {
        1
    } else {
        0
    };
    ScoreResult::valid(score)
}

pub fn age_risk(raw: Option<&Value>) -> ScoreResult {
    let Some(age) = raw.and_then(parse_age) else {
        return ScoreResult::invalid();
    };

    let score = if age > 65 {
        2
    } else if (40..=65).contains(&age) {
        1
    } else {
        0
    };
    ScoreResult::valid(score)
}

/// Parses `"S/D"` where both sides are plain digit runs. Whitespace anywhere
/// in the reading makes it invalid.
pub fn parse_blood_pressure(raw: &Value) -> Option<(u32, u32)> {
    let text = raw.as_str()?;
    let mut parts = text.split('/');
    let systolic = parse_digits(parts.next()?)?;
    let diastolic = parse_digits(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some((systolic, diastolic))
}

pub fn parse_temperature(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Integers pass through; decimals (numeric or textual) truncate toward zero.
pub fn parse_age(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(truncate_finite)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(truncate_finite))
        }
        _ => None,
    }
}

fn parse_digits(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn truncate_finite(value: f64) -> Option<i64> {
    if !value.is_finite() || value.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(value.trunc() as i64)
}
