use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One viewer utterance and the reply it got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub reply: String,
}

/// Most recent exchanges, oldest evicted first.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    exchanges: VecDeque<Exchange>,
    max_len: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ConversationHistory {
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            exchanges: VecDeque::with_capacity(max_len),
            max_len,
        }
    }

    pub fn push(&mut self, user: impl Into<String>, reply: impl Into<String>) {
        if self.exchanges.len() == self.max_len {
            self.exchanges.pop_front();
        }
        self.exchanges.push_back(Exchange {
            user: user.into(),
            reply: reply.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}
