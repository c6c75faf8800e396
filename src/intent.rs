//! Keyword intent classification.
//!
//! Each intent owns one Aho–Corasick automaton built from its keyword set.
//! Intents are tried in a fixed order and the first set with any substring
//! hit wins, so "book a service" is a pricing question, not a demo request.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use serde::Serialize;

use crate::error::BridgeError;
use crate::profile::BotProfile;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Pricing,
    Demo,
    Support,
    /// No keyword matched; the message goes to the model.
    General,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Pricing => "pricing",
            Intent::Demo => "demo",
            Intent::Support => "support",
            Intent::General => "general",
        }
    }
}

/// Lower-case and trim a message before matching.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

struct KeywordSet {
    intent: Intent,
    // None when the configured list is empty: such a set never matches.
    automaton: Option<AhoCorasick>,
}

impl KeywordSet {
    fn build(intent: Intent, keywords: &[String]) -> Result<Self, BridgeError> {
        let patterns: Vec<String> = keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| k.to_lowercase())
            .collect();
        if patterns.is_empty() {
            tracing::warn!(intent = intent.as_str(), "empty keyword set, intent disabled");
            return Ok(Self {
                intent,
                automaton: None,
            });
        }
        let automaton = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostFirst)
            .build(patterns)?;
        Ok(Self {
            intent,
            automaton: Some(automaton),
        })
    }

    fn matches(&self, hay: &str) -> bool {
        self.automaton.as_ref().is_some_and(|ac| ac.is_match(hay))
    }
}

/// Ordered keyword matcher. Cheap to share behind an `Arc`.
pub struct IntentMatcher {
    sets: Vec<KeywordSet>,
}

impl IntentMatcher {
    pub fn new(profile: &BotProfile) -> Result<Self, BridgeError> {
        let sets = vec![
            KeywordSet::build(Intent::Pricing, &profile.pricing_keywords)?,
            KeywordSet::build(Intent::Demo, &profile.demo_keywords)?,
            KeywordSet::build(Intent::Support, &profile.support_keywords)?,
        ];
        Ok(Self { sets })
    }

    /// Classify already-normalized text.
    pub fn classify(&self, normalized: &str) -> Intent {
        self.sets
            .iter()
            .find(|set| set.matches(normalized))
            .map(|set| set.intent)
            .unwrap_or(Intent::General)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> IntentMatcher {
        IntentMatcher::new(&BotProfile::default()).unwrap()
    }

    fn classify(raw: &str) -> Intent {
        matcher().classify(&normalize(raw))
    }

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize("  PRICING Please \n"), "pricing please");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn pricing_phrases() {
        for phrase in [
            "What's the PRICE?",
            "pricing",
            "Do you have a Package for shops",
            "show me your plans",
            "Which Services do you offer",
            "menu",
        ] {
            assert_eq!(classify(phrase), Intent::Pricing, "{phrase}");
        }
    }

    #[test]
    fn demo_phrases() {
        for phrase in [
            "Can I see a DEMO",
            "call me tomorrow",
            "set up a Meeting",
            "I want to book",
        ] {
            assert_eq!(classify(phrase), Intent::Demo, "{phrase}");
        }
    }

    #[test]
    fn support_phrases() {
        for phrase in [
            "need SUPPORT",
            "Help!",
            "there is an issue with my bot",
            "Problem with the website",
        ] {
            assert_eq!(classify(phrase), Intent::Support, "{phrase}");
        }
    }

    #[test]
    fn general_when_nothing_matches() {
        assert_eq!(classify("hello there"), Intent::General);
        assert_eq!(classify("what do you do?"), Intent::General);
    }

    #[test]
    fn earlier_sets_win() {
        assert_eq!(classify("book a service"), Intent::Pricing);
        assert_eq!(classify("help me book a demo"), Intent::Demo);
        assert_eq!(classify("menu help"), Intent::Pricing);
    }

    #[test]
    fn substring_containment_counts() {
        // "callback" contains "call", "booking" contains "book".
        assert_eq!(classify("callback please"), Intent::Demo);
        assert_eq!(classify("booking"), Intent::Demo);
    }

    #[test]
    fn empty_keyword_set_never_matches() {
        let profile = BotProfile {
            support_keywords: vec!["  ".into()],
            ..BotProfile::default()
        };
        let m = IntentMatcher::new(&profile).unwrap();
        assert_eq!(m.classify("help"), Intent::General);
    }

    #[test]
    fn padded_keywords_keep_their_spaces() {
        let profile = BotProfile {
            demo_keywords: vec![" call ".into()],
            ..BotProfile::default()
        };
        let m = IntentMatcher::new(&profile).unwrap();
        assert_eq!(m.classify(&normalize("please call me")), Intent::Demo);
        assert_eq!(m.classify(&normalize("callback please")), Intent::General);
        assert_eq!(m.classify(&normalize("call")), Intent::General);
    }
}
