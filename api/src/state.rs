use std::sync::Arc;

use melvis_core::{QuestionBank, ScoringPolicy};

use crate::store::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub bank: Arc<QuestionBank>,
    pub policy: ScoringPolicy,
    pub store: Arc<MemoryStore>,
}

impl AppState {
    pub fn new(bank: QuestionBank, policy: ScoringPolicy, store: MemoryStore) -> Self {
        Self {
            bank: Arc::new(bank),
            policy,
            store: Arc::new(store),
        }
    }
}
