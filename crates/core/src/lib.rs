pub mod analysis;
pub mod history;
pub mod planner;

pub use analysis::{Analysis, Intent, KeywordAnalyzer, Sentiment, TextAnalyzer};
pub use history::{ConversationHistory, Exchange};
pub use planner::{ReplyPlanner, ResponseIntent, RuleBasedPlanner};

/// Represents commands that the reply logic issues to an external runtime.
///
/// This enum decouples deciding how the avatar should react from the
/// runtime that drives VTube Studio and delivers the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch the avatar to the expression with the given configured key.
    SetExpression(String),
    /// Play the motion with the given configured key.
    SetMotion(String),
    /// Deliver the given reply text to the viewer.
    SpeakText(String),
}
