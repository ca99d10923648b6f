use crate::bubble::Transition;
use crate::data::Record;
use std::time::{Duration, Instant};

pub const FADE_IN: Duration = Duration::from_millis(200);
pub const FADE_OUT: Duration = Duration::from_millis(500);
pub const SHOWN_OPACITY: f64 = 0.9;

/// Floating label for the hovered bubble.
///
/// Keeps its subject while fading out so the last content stays readable.
#[derive(Clone, Debug)]
pub struct Tooltip {
    subject: Option<String>,
    opacity: Transition<f64>,
}

impl Tooltip {
    pub fn new(now: Instant) -> Self {
        Self {
            subject: None,
            opacity: Transition::settled(0.0, now),
        }
    }

    /// Start showing the tooltip for bubble `key`
    pub fn hover(&mut self, key: &str, now: Instant) {
        self.subject = Some(key.to_string());
        self.opacity = self.opacity.retarget(SHOWN_OPACITY, now, FADE_IN);
    }

    /// Start fading out
    pub fn leave(&mut self, now: Instant) {
        self.opacity = self.opacity.retarget(0.0, now, FADE_OUT);
    }

    /// Key of the bubble being (or last) described
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Whether the pointer is currently over the subject
    pub fn is_hovering(&self) -> bool {
        self.subject.is_some() && self.opacity.target() > 0.0
    }

    pub fn opacity(&self, now: Instant) -> f64 {
        self.opacity.sample(now)
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        self.subject.is_some() && self.opacity(now) > 0.01
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        !self.opacity.is_done(now)
    }

    /// Lines shown for `record`: name, selected cause with its value, year
    pub fn content(record: &Record, cause: &str, value: Option<f64>) -> Vec<String> {
        vec![
            record.name.clone(),
            format!("{cause}: {}", format_value(value)),
            format!("Year: {}", record.year),
        ]
    }
}

/// Whole counts print without decimals
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => format!("{v:.2}"),
        None => "no data".to_string(),
    }
}
