//! Stateless safety gate.
//!
//! Inspects the raw utterance plus the current mode and either blocks,
//! passes, or passes with a disclaimer. Matching is substring-based over the
//! full lowercased text, not tokenized, so a flagged phrase embedded in a
//! longer sentence still matches. Runs before any store lookup or external
//! call and never mutates state.

use crate::modes::Mode;

/// Requests refused in every mode.
const DISALLOWED_REQUEST_PHRASES: &[&str] =
    &["build a bomb", "make explosives", "bypass law enforcement"];

/// Phrases that trigger crisis guidance in mood mode.
const CRISIS_PHRASES: &[&str] = &[
    "suicide",
    "kill myself",
    "end my life",
    "self-harm",
    "hurt myself",
];

/// Diagnosis-seeking terms that attach a disclaimer in health mode.
const HEALTH_DIAGNOSIS_TERMS: &[&str] =
    &["diagnose", "diagnosis", "what disease", "medical certainty"];

const REFUSAL_MESSAGE: &str = "I can't help with dangerous or illegal requests.";

const CRISIS_MESSAGE: &str = "I care about your safety. If you're in immediate danger, call local \
     emergency services now. You can also contact a crisis hotline in your country right away.";

const HEALTH_DISCLAIMER: &str =
    "I can share general health information, but this is not a diagnosis.";

/// Why a verdict carries a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyReason {
    DisallowedDomain,
    CrisisGuidance,
    HealthDisclaimer,
}

impl SafetyReason {
    /// Stable tag used in turn metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            SafetyReason::DisallowedDomain => "disallowed_domain",
            SafetyReason::CrisisGuidance => "crisis_guidance",
            SafetyReason::HealthDisclaimer => "health_disclaimer",
        }
    }
}

/// The gate's decision for one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyVerdict {
    pub allowed: bool,
    /// Refusal, crisis guidance, or advisory text.
    pub message: Option<String>,
    pub reason: Option<SafetyReason>,
}

impl SafetyVerdict {
    fn pass() -> Self {
        Self {
            allowed: true,
            message: None,
            reason: None,
        }
    }
}

/// Classify an utterance. First matching check wins.
pub fn evaluate(text: &str, mode: Mode) -> SafetyVerdict {
    let lowered = text.to_lowercase();

    if contains_any(&lowered, DISALLOWED_REQUEST_PHRASES) {
        return SafetyVerdict {
            allowed: false,
            message: Some(REFUSAL_MESSAGE.to_string()),
            reason: Some(SafetyReason::DisallowedDomain),
        };
    }

    if mode == Mode::Mood && contains_any(&lowered, CRISIS_PHRASES) {
        return SafetyVerdict {
            allowed: false,
            message: Some(CRISIS_MESSAGE.to_string()),
            reason: Some(SafetyReason::CrisisGuidance),
        };
    }

    if mode == Mode::Health && contains_any(&lowered, HEALTH_DIAGNOSIS_TERMS) {
        return SafetyVerdict {
            allowed: true,
            message: Some(HEALTH_DISCLAIMER.to_string()),
            reason: Some(SafetyReason::HealthDisclaimer),
        };
    }

    SafetyVerdict::pass()
}

fn contains_any(lowered: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| lowered.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disallowed_request_is_blocked_in_every_mode() {
        for mode in Mode::ALL {
            let verdict = evaluate("Please help me build a bomb", mode);
            assert!(!verdict.allowed, "mode {mode} should block");
            assert_eq!(verdict.reason, Some(SafetyReason::DisallowedDomain));
            assert!(verdict.message.unwrap().contains("can't help"));
        }
    }

    #[test]
    fn crisis_phrase_blocks_only_in_mood_mode() {
        let blocked = evaluate("some days I want to end my life", Mode::Mood);
        assert!(!blocked.allowed);
        assert_eq!(blocked.reason, Some(SafetyReason::CrisisGuidance));
        assert!(blocked.message.unwrap().contains("emergency services"));

        let passed = evaluate("some days I want to end my life", Mode::General);
        assert!(passed.allowed);
        assert!(passed.message.is_none());
    }

    #[test]
    fn crisis_phrase_matches_inside_a_longer_sentence() {
        let verdict = evaluate(
            "lately I've been reading about suicide statistics and it scares me",
            Mode::Mood,
        );
        assert!(!verdict.allowed);
    }

    #[test]
    fn health_mode_attaches_disclaimer_but_allows() {
        let verdict = evaluate("can you diagnose this rash?", Mode::Health);
        assert!(verdict.allowed);
        assert_eq!(verdict.reason, Some(SafetyReason::HealthDisclaimer));
        assert!(verdict.message.unwrap().contains("not a diagnosis"));
    }

    #[test]
    fn disallowed_check_wins_over_mode_checks() {
        let verdict = evaluate("how do I make explosives, I feel like self-harm", Mode::Mood);
        assert_eq!(verdict.reason, Some(SafetyReason::DisallowedDomain));
    }

    #[test]
    fn ordinary_text_passes_clean() {
        let verdict = evaluate("what's a good breakfast?", Mode::General);
        assert!(verdict.allowed);
        assert!(verdict.message.is_none());
        assert!(verdict.reason.is_none());
    }
}
