//! Viewer Text to Avatar Reaction
//!
//! [`Pipeline`] analyzes an utterance, plans a reply and keeps the recent
//! conversation. [`execute`] carries the planned commands out against a live
//! VTube Studio session.

use anyhow::{Context, Result};
use pilot_core::{Command, ConversationHistory, ReplyPlanner, ResponseIntent, TextAnalyzer};
use std::sync::Arc;
use tracing::{info, warn};
use vts_client::{AvatarAction, VtsClient};

pub struct Pipeline {
    analyzer: Arc<dyn TextAnalyzer>,
    planner: Arc<dyn ReplyPlanner>,
    history: ConversationHistory,
}

impl Pipeline {
    pub fn new(analyzer: Arc<dyn TextAnalyzer>, planner: Arc<dyn ReplyPlanner>) -> Self {
        Self {
            analyzer,
            planner,
            history: ConversationHistory::default(),
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Plans the reaction to `text` and records the exchange.
    pub async fn respond(&mut self, text: &str) -> Result<ResponseIntent> {
        let analysis = self
            .analyzer
            .analyze(text)
            .await
            .context("Failed to analyze text")?;
        info!(intent = ?analysis.intent, sentiment = ?analysis.sentiment, "Text analyzed");

        let planned = self
            .planner
            .plan(text, &analysis)
            .await
            .context("Failed to plan reply")?;
        self.history.push(text, planned.reply.clone());
        Ok(planned)
    }
}

/// Runs `commands` in order and returns the texts to deliver.
///
/// Avatar command failures are logged and do not hold back the reply.
pub async fn execute(client: &VtsClient, commands: &[Command]) -> Vec<String> {
    let mut spoken = Vec::new();
    for command in commands {
        let action = match command {
            Command::SetExpression(key) => AvatarAction::Expression(key.clone()),
            Command::SetMotion(key) => AvatarAction::Motion(key.clone()),
            Command::SpeakText(text) => {
                spoken.push(text.clone());
                continue;
            }
        };
        if let Err(e) = client.apply(&action).await {
            warn!(?action, error = %e, "Avatar command failed");
        }
    }
    spoken
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use pilot_core::{Analysis, Intent, KeywordAnalyzer, RuleBasedPlanner, Sentiment};
    use vts_client::ClientConfig;

    mock! {
        pub Analyzer {}

        #[async_trait]
        impl TextAnalyzer for Analyzer {
            async fn analyze(&self, text: &str) -> Result<Analysis>;
        }
    }

    #[tokio::test]
    async fn test_respond_records_history() {
        let mut pipeline = Pipeline::new(Arc::new(KeywordAnalyzer), Arc::new(RuleBasedPlanner));

        let planned = pipeline.respond("hello everyone").await.unwrap();

        assert_eq!(planned.expression.as_deref(), Some("happy"));
        assert_eq!(pipeline.history().len(), 1);
        let exchange = pipeline.history().iter().next().unwrap();
        assert_eq!(exchange.user, "hello everyone");
        assert_eq!(exchange.reply, planned.reply);
    }

    #[tokio::test]
    async fn test_respond_uses_analyzer_result() {
        let mut analyzer = MockAnalyzer::new();
        analyzer.expect_analyze().times(1).returning(|_| {
            Ok(Analysis::new(Intent::BookFlight, Sentiment::Neutral).with_entity("location", "Osaka"))
        });
        let mut pipeline = Pipeline::new(Arc::new(analyzer), Arc::new(RuleBasedPlanner));

        let planned = pipeline.respond("anything").await.unwrap();

        assert!(planned.reply.contains("Osaka"));
    }

    #[tokio::test]
    async fn test_analyzer_failure_is_not_recorded() {
        let mut analyzer = MockAnalyzer::new();
        analyzer
            .expect_analyze()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("model unavailable")));
        let mut pipeline = Pipeline::new(Arc::new(analyzer), Arc::new(RuleBasedPlanner));

        let err = pipeline.respond("hello").await.unwrap_err();

        assert!(format!("{err:#}").contains("model unavailable"));
        assert!(pipeline.history().is_empty());
    }

    #[tokio::test]
    async fn test_execute_delivers_reply_without_session() {
        let client = VtsClient::new(ClientConfig::default());
        let commands = vec![
            Command::SetExpression("happy".to_string()),
            Command::SetMotion("wave".to_string()),
            Command::SpeakText("Hello!".to_string()),
        ];

        let spoken = execute(&client, &commands).await;

        assert_eq!(spoken, vec!["Hello!".to_string()]);
        assert!(client.latency().is_empty());
    }
}
