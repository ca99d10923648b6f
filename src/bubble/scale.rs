/// Square-root radius scale: bubble *area* grows linearly with the value.
///
/// Maps the domain `[0, max_value]` onto `[0, max_radius]`. A degenerate
/// domain (no finite positive maximum) maps everything to zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SqrtScale {
    max_value: f64,
    max_radius: f64,
}

impl SqrtScale {
    pub fn new(max_value: f64, max_radius: f64) -> Self {
        Self {
            max_value,
            max_radius: if max_radius.is_finite() { max_radius.max(0.0) } else { 0.0 },
        }
    }

    /// Build the scale from the largest finite value in `values`
    pub fn from_values(values: impl IntoIterator<Item = f64>, max_radius: f64) -> Self {
        let max_value = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max);
        Self::new(max_value, max_radius)
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.max_value.is_finite() && self.max_value > 0.0)
    }

    pub fn radius(&self, value: f64) -> f64 {
        if self.is_degenerate() || !value.is_finite() || value <= 0.0 {
            return 0.0;
        }
        let t = (value / self.max_value).min(1.0);
        self.max_radius * t.sqrt()
    }
}
