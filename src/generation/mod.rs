use anyhow::Result;
use async_trait::async_trait;

pub mod parse;
pub mod prompts;
pub mod service;
pub mod types;

pub use service::QuestionService;
pub use types::{Question, QuestionCounts, QuestionKind};

/// Text-in, text-out access to a hosted language model.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    /// Answers open-question prompts with one canned reply and yes/no prompts with another.
    pub struct ScriptedCompleter {
        open_reply: String,
        yes_no_reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedCompleter {
        pub fn new(open_reply: &str, yes_no_reply: &str) -> Self {
            Self {
                open_reply: open_reply.to_string(),
                yes_no_reply: yes_no_reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Completer for ScriptedCompleter {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if prompt.contains("yes/no questions about") {
                Ok(self.yes_no_reply.clone())
            } else {
                Ok(self.open_reply.clone())
            }
        }
    }

    pub struct FailingCompleter;

    #[async_trait]
    impl Completer for FailingCompleter {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(anyhow!("model endpoint unavailable"))
        }
    }
}
