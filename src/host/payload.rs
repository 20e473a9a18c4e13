//! Coercion of untrusted height payloads.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotANumber,
    NotFinite,
    NotPositive,
    /// Within one pixel of the committed height.
    WithinThreshold,
    Disposed,
}

/// A raw height report as it arrives from the channel.
#[derive(Debug, Clone, Copy)]
pub enum HeightSample<'a> {
    Number(f64),
    Text(&'a str),
    Json(&'a Value),
}

impl HeightSample<'_> {
    /// Numeric value of the sample, if it is a finite, strictly positive number.
    pub fn coerce(&self) -> Result<f64, RejectReason> {
        let value = match self {
            HeightSample::Number(n) => *n,
            HeightSample::Text(text) => parse_number(text)?,
            HeightSample::Json(Value::Number(n)) => n.as_f64().ok_or(RejectReason::NotANumber)?,
            HeightSample::Json(Value::String(text)) => parse_number(text)?,
            HeightSample::Json(_) => return Err(RejectReason::NotANumber),
        };
        if !value.is_finite() {
            return Err(RejectReason::NotFinite);
        }
        if value <= 0.0 {
            return Err(RejectReason::NotPositive);
        }
        Ok(value)
    }
}

fn parse_number(text: &str) -> Result<f64, RejectReason> {
    text.trim().parse::<f64>().map_err(|_| RejectReason::NotANumber)
}

impl From<f64> for HeightSample<'_> {
    fn from(value: f64) -> Self {
        HeightSample::Number(value)
    }
}

impl From<u32> for HeightSample<'_> {
    fn from(value: u32) -> Self {
        HeightSample::Number(value as f64)
    }
}

impl From<i32> for HeightSample<'_> {
    fn from(value: i32) -> Self {
        HeightSample::Number(value as f64)
    }
}

impl<'a> From<&'a str> for HeightSample<'a> {
    fn from(value: &'a str) -> Self {
        HeightSample::Text(value)
    }
}

impl<'a> From<&'a String> for HeightSample<'a> {
    fn from(value: &'a String) -> Self {
        HeightSample::Text(value)
    }
}

impl<'a> From<&'a Value> for HeightSample<'a> {
    fn from(value: &'a Value) -> Self {
        HeightSample::Json(value)
    }
}

/// `ceil` into whole pixels, saturating at `u32::MAX`.
pub(crate) fn ceil_px(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let rounded = value.ceil();
    if rounded >= u32::MAX as f64 {
        u32::MAX
    } else {
        rounded as u32
    }
}
