use serde::{Deserialize, Serialize};

/// Transient failures come from the environment and are worth resubmitting;
/// permanent failures come from the plan's inputs and need replanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Transient,
    Permanent,
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        };
        write!(f, "{}", s)
    }
}

/// Input/content problems. Checked before the transient table so that a
/// message naming both (e.g. a timeout while fetching a dead URI) replans
/// instead of burning retries.
const PERMANENT_MARKERS: &[&str] = &[
    "404",
    "not found",
    "410",
    "gone",
    "401",
    "unauthorized",
    "403",
    "forbidden",
    "authentication",
    "login required",
    "paywall",
    "unsupported format",
    "unsupported media",
    "invalid uri",
    "invalid url",
    "malformed",
    "permanently unavailable",
    "removed by the uploader",
    "dmca",
    // Validation gates report content problems; resubmitting the same plan
    // cannot fix them.
    "validation failed",
];

/// Environmental conditions: executor pressure, timeouts, contention with a
/// higher-priority consumer.
const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "resource conflict",
    "resource exhaustion",
    "out of memory",
    "memory pressure",
    "thermal",
    "overheat",
    "throttl",
    "busy",
    "temporarily unavailable",
    "rate limit",
    "429",
    "502",
    "503",
    "504",
    "connection reset",
    "higher-priority",
];

/// Deterministic rule lookup, not inference. Reasons matching neither table
/// default to transient; the retry ceiling bounds the optimism.
pub fn classify(reason: &str) -> FailureClass {
    let lower = reason.to_lowercase();

    if PERMANENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return FailureClass::Permanent;
    }
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return FailureClass::Transient;
    }
    FailureClass::Transient
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_reasons() {
        assert_eq!(classify("endpoint returned 404"), FailureClass::Permanent);
        assert_eq!(classify("login required for feed"), FailureClass::Permanent);
        assert_eq!(classify("Unsupported format: wma"), FailureClass::Permanent);
        assert_eq!(classify("invalid URI in plan"), FailureClass::Permanent);
    }

    #[test]
    fn test_transient_reasons() {
        assert_eq!(classify("executor resource conflict"), FailureClass::Transient);
        assert_eq!(classify("download timed out after 900s"), FailureClass::Transient);
        assert_eq!(classify("thermal limit reached, task evicted"), FailureClass::Transient);
        assert_eq!(classify("HTTP 503 from origin"), FailureClass::Transient);
    }

    #[test]
    fn test_permanent_wins_over_transient() {
        assert_eq!(
            classify("timed out waiting for a 404 page"),
            FailureClass::Permanent
        );
    }

    #[test]
    fn test_unknown_defaults_to_transient() {
        assert_eq!(classify("weird one-off glitch"), FailureClass::Transient);
    }
}
