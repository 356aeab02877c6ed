//! Reply Planning
//!
//! Maps an [`Analysis`] to how the avatar should react: which expression to
//! show and what to say back.

use crate::{
    Command,
    analysis::{Analysis, Intent, Sentiment},
};
use anyhow::Result;
use async_trait::async_trait;

/// The planned reaction to one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseIntent {
    /// Configured expression key, e.g. `happy`.
    pub expression: Option<String>,
    /// Configured motion key, e.g. `wave`.
    pub motion: Option<String>,
    pub reply: String,
}

impl ResponseIntent {
    pub fn new(expression: &str, reply: impl Into<String>) -> Self {
        Self {
            expression: Some(expression.to_string()),
            motion: None,
            reply: reply.into(),
        }
    }

    #[must_use]
    pub fn with_motion(mut self, motion: &str) -> Self {
        self.motion = Some(motion.to_string());
        self
    }

    /// Runtime commands in execution order: avatar changes first, then the reply.
    pub fn commands(&self) -> Vec<Command> {
        let mut commands = Vec::with_capacity(3);
        if let Some(expression) = &self.expression {
            commands.push(Command::SetExpression(expression.clone()));
        }
        if let Some(motion) = &self.motion {
            commands.push(Command::SetMotion(motion.clone()));
        }
        commands.push(Command::SpeakText(self.reply.clone()));
        commands
    }
}

/// Defines the contract for any service that decides how to reply.
#[async_trait]
pub trait ReplyPlanner: Send + Sync {
    async fn plan(&self, text: &str, analysis: &Analysis) -> Result<ResponseIntent>;
}

/// Fixed intent and sentiment rules.
///
/// Intent wins over sentiment; sentiment only decides the reaction when the
/// intent is unknown.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedPlanner;

impl RuleBasedPlanner {
    pub fn plan_sync(&self, analysis: &Analysis) -> ResponseIntent {
        match analysis.intent {
            Intent::Greet => {
                ResponseIntent::new("happy", "Hello! How can I assist you today?").with_motion("wave")
            }
            Intent::AskHelp => ResponseIntent::new(
                "thinking",
                "Sure, I'm here to help. What do you need assistance with?",
            ),
            Intent::Goodbye => {
                ResponseIntent::new("sad", "Goodbye! Have a great day!").with_motion("wave")
            }
            Intent::BookFlight => {
                let location = analysis
                    .entity("location")
                    .unwrap_or("your desired destination");
                ResponseIntent::new(
                    "neutral",
                    format!(
                        "Sure, I can help you book a flight to {location}. When would you like to travel?"
                    ),
                )
                .with_motion("nod")
            }
            Intent::Unknown => match analysis.sentiment {
                Sentiment::Positive => ResponseIntent::new(
                    "happy",
                    "I'm glad to hear that! How can I assist you further?",
                ),
                Sentiment::Negative => ResponseIntent::new(
                    "concerned",
                    "I'm sorry you're feeling that way. How can I help?",
                ),
                Sentiment::Neutral => ResponseIntent::new(
                    "neutral",
                    "I'm not sure how to respond to that. Could you please elaborate?",
                ),
            },
        }
    }
}

#[async_trait]
impl ReplyPlanner for RuleBasedPlanner {
    async fn plan(&self, _text: &str, analysis: &Analysis) -> Result<ResponseIntent> {
        Ok(self.plan_sync(analysis))
    }
}
