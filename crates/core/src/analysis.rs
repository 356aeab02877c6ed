//! Text Analysis
//!
//! Turns a viewer's utterance into a structured [`Analysis`] that reply
//! planning can act on. Real NLU backends plug in behind [`TextAnalyzer`];
//! [`KeywordAnalyzer`] is a deterministic stand-in that needs no model.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the speaker is trying to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greet,
    AskHelp,
    Goodbye,
    BookFlight,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// The result of analyzing one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub intent: Intent,
    pub sentiment: Sentiment,
    /// Named slots extracted from the text, e.g. `location`.
    #[serde(default)]
    pub entities: HashMap<String, String>,
}

impl Analysis {
    pub fn new(intent: Intent, sentiment: Sentiment) -> Self {
        Self {
            intent,
            sentiment,
            entities: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_entity(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entities.insert(name.into(), value.into());
        self
    }

    pub fn entity(&self, name: &str) -> Option<&str> {
        self.entities.get(name).map(String::as_str)
    }
}

/// Defines the contract for any service that can analyze viewer text.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<Analysis>;
}

const GREETINGS: &[&str] = &["hello", "hi", "hey", "good morning", "good evening"];
const HELP: &[&str] = &["help", "assist", "support"];
const FAREWELLS: &[&str] = &["bye", "goodbye", "see you", "good night"];
const FLIGHT: &[&str] = &["flight", "fly to", "plane ticket"];
const POSITIVE: &[&str] = &["great", "love", "awesome", "happy", "thanks", "nice", "glad"];
const NEGATIVE: &[&str] = &["sad", "bad", "terrible", "hate", "angry", "awful", "upset"];

/// Keyword-matching analyzer.
///
/// Intents are tried in order: greeting, help, farewell, flight booking.
/// A destination following "to" is captured as the `location` entity.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    pub fn analyze_sync(&self, text: &str) -> Analysis {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .collect();
        let joined = words.join(" ");
        let mentions = |phrases: &[&str]| {
            phrases.iter().any(|p| {
                if p.contains(' ') {
                    joined.contains(p)
                } else {
                    words.contains(p)
                }
            })
        };

        let intent = if mentions(GREETINGS) {
            Intent::Greet
        } else if mentions(HELP) {
            Intent::AskHelp
        } else if mentions(FAREWELLS) {
            Intent::Goodbye
        } else if mentions(FLIGHT) {
            Intent::BookFlight
        } else {
            Intent::Unknown
        };

        let positive = mentions(POSITIVE);
        let negative = mentions(NEGATIVE);
        let sentiment = match (positive, negative) {
            (true, false) => Sentiment::Positive,
            (false, true) => Sentiment::Negative,
            _ => Sentiment::Neutral,
        };

        let mut analysis = Analysis::new(intent, sentiment);
        if analysis.intent == Intent::BookFlight {
            if let Some(location) = destination(text) {
                analysis = analysis.with_entity("location", location);
            }
        }
        analysis
    }
}

#[async_trait]
impl TextAnalyzer for KeywordAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Analysis> {
        let analysis = self.analyze_sync(text);
        tracing::debug!(?analysis, "Analyzed text");
        Ok(analysis)
    }
}

/// Capitalized words following the last standalone "to", keeping the
/// original casing.
fn destination(text: &str) -> Option<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let at = tokens.iter().rposition(|t| t.eq_ignore_ascii_case("to"))?;
    let place: Vec<&str> = tokens[at + 1..]
        .iter()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .take_while(|t| t.chars().next().is_some_and(char::is_uppercase))
        .collect();
    (!place.is_empty()).then(|| place.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_is_detected() {
        let analysis = KeywordAnalyzer.analyze_sync("Hello there!");
        assert_eq!(analysis.intent, Intent::Greet);
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        // "this" contains "hi" but is not a greeting.
        let analysis = KeywordAnalyzer.analyze_sync("this is fine");
        assert_eq!(analysis.intent, Intent::Unknown);
    }

    #[test]
    fn test_flight_booking_captures_destination() {
        let analysis = KeywordAnalyzer.analyze_sync("I need a flight to New York, please");
        assert_eq!(analysis.intent, Intent::BookFlight);
        assert_eq!(analysis.entity("location"), Some("New York"));
    }

    #[test]
    fn test_flight_booking_without_destination() {
        let analysis = KeywordAnalyzer.analyze_sync("book me a flight");
        assert_eq!(analysis.intent, Intent::BookFlight);
        assert!(analysis.entities.is_empty());
    }

    #[test]
    fn test_sentiment_without_intent() {
        let positive = KeywordAnalyzer.analyze_sync("I love this stream");
        assert_eq!(positive.intent, Intent::Unknown);
        assert_eq!(positive.sentiment, Sentiment::Positive);

        let negative = KeywordAnalyzer.analyze_sync("today was terrible");
        assert_eq!(negative.sentiment, Sentiment::Negative);

        let mixed = KeywordAnalyzer.analyze_sync("I love it but it's awful");
        assert_eq!(mixed.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_analysis_deserializes_snake_case() {
        let analysis: Analysis = serde_json::from_str(
            r#"{"intent":"ask_help","sentiment":"negative","entities":{}}"#,
        )
        .unwrap();
        assert_eq!(analysis.intent, Intent::AskHelp);
        assert_eq!(analysis.sentiment, Sentiment::Negative);
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let analyzer: Box<dyn TextAnalyzer> = Box::new(KeywordAnalyzer);
        let analysis = analyzer.analyze("goodbye everyone").await.unwrap();
        assert_eq!(analysis.intent, Intent::Goodbye);
    }
}
