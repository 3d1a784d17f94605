//! Classification verdicts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary classifier output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Class 0
    Legitimate,
    /// Class 1
    Fraudulent,
}

impl Label {
    /// Map a score onto a label using the decision threshold
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score >= threshold {
            Label::Fraudulent
        } else {
            Label::Legitimate
        }
    }

    pub fn from_flag(is_fraud: bool) -> Self {
        if is_fraud {
            Label::Fraudulent
        } else {
            Label::Legitimate
        }
    }

    /// Numeric class id (0 = legitimate, 1 = fraudulent)
    pub fn class_id(self) -> u8 {
        match self {
            Label::Legitimate => 0,
            Label::Fraudulent => 1,
        }
    }

    /// Line printed by the entry point for this verdict
    pub fn verdict(self) -> &'static str {
        match self {
            Label::Legitimate => "Transaction OK!",
            Label::Fraudulent => "Transaction FRAUDULENT!",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Legitimate => write!(f, "OK"),
            Label::Fraudulent => write!(f, "FRAUDULENT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_score() {
        assert_eq!(Label::from_score(0.49, 0.5), Label::Legitimate);
        assert_eq!(Label::from_score(0.5, 0.5), Label::Fraudulent);
        assert_eq!(Label::from_score(0.9, 0.5), Label::Fraudulent);
    }

    #[test]
    fn test_verdicts() {
        assert_eq!(Label::Legitimate.class_id(), 0);
        assert_eq!(Label::Fraudulent.class_id(), 1);
        assert_eq!(Label::Legitimate.verdict(), "Transaction OK!");
        assert_eq!(Label::Fraudulent.verdict(), "Transaction FRAUDULENT!");
        assert_eq!(Label::Fraudulent.to_string(), "FRAUDULENT");
    }
}
