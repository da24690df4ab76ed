//! Result record shared by all repair operations.

/// Outcome of a best-effort repair.
///
/// `value` is either the repaired geometry or the untouched input. Failure to
/// repair is not an error: `changed` is false and `fail_reasons` says why.
#[derive(Debug, Clone, PartialEq)]
pub struct HealResult<T> {
    /// Repaired geometry, or the original when nothing was applied.
    pub value: T,
    /// Whether `value` differs from the input.
    pub changed: bool,
    /// Measured deviation of `value` from the input, when it was checked.
    pub deviation: Option<f64>,
    /// Name of the strategy that produced `value`.
    pub applied: Option<&'static str>,
    /// Reasons collected from strategies that were rejected.
    pub fail_reasons: Vec<String>,
}

impl<T> HealResult<T> {
    /// The input returned as-is, with nothing to report.
    #[must_use]
    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            changed: false,
            deviation: None,
            applied: None,
            fail_reasons: Vec::new(),
        }
    }

    /// The input returned as-is because every strategy failed.
    #[must_use]
    pub fn failed(value: T, fail_reasons: Vec<String>) -> Self {
        Self {
            fail_reasons,
            ..Self::unchanged(value)
        }
    }

    /// A repaired value produced by `applied`.
    #[must_use]
    pub fn fixed(value: T, applied: &'static str, deviation: Option<f64>) -> Self {
        Self {
            value,
            changed: true,
            deviation,
            applied: Some(applied),
            fail_reasons: Vec::new(),
        }
    }

    /// Attaches the reasons of strategies rejected before this one.
    #[must_use]
    pub fn with_fail_reasons(mut self, reasons: Vec<String>) -> Self {
        self.fail_reasons = reasons;
        self
    }

    /// All fail reasons joined into one line, if there are any.
    #[must_use]
    pub fn fail_reason(&self) -> Option<String> {
        if self.fail_reasons.is_empty() {
            None
        } else {
            Some(self.fail_reasons.join("; "))
        }
    }

    /// Maps the carried value, keeping the diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> HealResult<U> {
        HealResult {
            value: f(self.value),
            changed: self.changed,
            deviation: self.deviation,
            applied: self.applied,
            fail_reasons: self.fail_reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_keeps_value_and_joins_reasons() {
        let r = HealResult::failed(3, vec!["a".into(), "b".into()]);
        assert!(!r.changed);
        assert_eq!(r.value, 3);
        assert_eq!(r.fail_reason().as_deref(), Some("a; b"));
    }

    #[test]
    fn map_keeps_diagnostics() {
        let r = HealResult::fixed(2, "double", Some(0.5)).map(|v| v * 2);
        assert_eq!(r.value, 4);
        assert_eq!(r.applied, Some("double"));
        assert!(r.changed);
    }
}
