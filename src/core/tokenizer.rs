//! Token estimation for LLM context budgeting
//!
//! This is a coarse heuristic, not a tokenizer: one token per four characters,
//! rounded up. It is deterministic and non-decreasing in character count, which
//! is all the budget accounting needs.
//!
//! Usage:
//! ```rust,ignore
//! use crate::core::tokenizer::estimate_tokens;
//!
//! assert_eq!(estimate_tokens("Hello world"), 3);
//! ```

/// Characters per estimated token
pub const CHARS_PER_TOKEN: usize = 4;

/// Advisory context-window sizes, in ascending order
pub const TOKEN_THRESHOLDS: &[(usize, &str)] = &[
    (128_000, "128K"),
    (200_000, "200K"),
    (1_000_000, "1M"),
];

/// Estimate tokens as `ceil(char_count / 4)`
pub fn estimate_tokens(text: &str) -> usize {
    estimate_tokens_for_chars(text.chars().count())
}

/// Same estimate for an already-known character count
pub fn estimate_tokens_for_chars(chars: usize) -> usize {
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// The largest advisory threshold that `total` exceeds, if any
pub fn crossed_threshold(total: usize) -> Option<(usize, &'static str)> {
    TOKEN_THRESHOLDS
        .iter()
        .rev()
        .find(|(limit, _)| total > *limit)
        .copied()
}

/// Optional ceiling on the cumulative token total of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenBudget {
    limit: Option<usize>,
    used: usize,
}

impl TokenBudget {
    pub fn new(limit: Option<usize>) -> Self {
        Self { limit, used: 0 }
    }

    #[cfg(test)]
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Reserve `tokens`; returns false (and reserves nothing) if that would
    /// push the running total past the ceiling.
    pub fn try_consume(&mut self, tokens: usize) -> bool {
        if let Some(limit) = self.limit {
            if self.used + tokens > limit {
                return false;
            }
        }
        self.used += tokens;
        true
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_empty() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("Hello world"), 3);
    }

    #[test]
    fn test_estimate_tokens_counts_chars_not_bytes() {
        // 4 chars, 12 bytes
        assert_eq!(estimate_tokens("你好世界"), 1);
        assert_eq!(estimate_tokens("\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD}"), 2);
    }

    #[test]
    fn test_estimate_tokens_matches_formula_and_is_monotonic() {
        let mut previous = 0;
        for len in 0..200 {
            let text = "x".repeat(len);
            let tokens = estimate_tokens(&text);
            assert_eq!(tokens, (len + 3) / 4);
            assert!(tokens >= previous);
            previous = tokens;
        }
    }

    #[test]
    fn test_crossed_threshold() {
        assert_eq!(crossed_threshold(0), None);
        assert_eq!(crossed_threshold(128_000), None);
        assert_eq!(crossed_threshold(128_001).map(|t| t.1), Some("128K"));
        assert_eq!(crossed_threshold(500_000).map(|t| t.1), Some("200K"));
        assert_eq!(crossed_threshold(2_000_000).map(|t| t.1), Some("1M"));
    }

    #[test]
    fn test_budget_unlimited() {
        let mut budget = TokenBudget::unlimited();
        assert!(budget.try_consume(usize::MAX / 2));
        assert_eq!(budget.limit(), None);
    }

    #[test]
    fn test_budget_rejects_overflowing_item_but_keeps_going() {
        let mut budget = TokenBudget::new(Some(10));
        assert!(budget.try_consume(6));
        assert!(!budget.try_consume(5));
        assert_eq!(budget.used(), 6);
        // A smaller item still fits after a rejection
        assert!(budget.try_consume(4));
        assert_eq!(budget.used(), 10);
        assert!(!budget.try_consume(1));
    }
}
