use std::sync::{Arc, Mutex};

use core_views::{ChatModel, ChatRequest};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct MockChatModel {
    pub reply: String,
    pub calls: Arc<Mutex<Vec<ChatRequest>>>,
    pub fail_with: Option<String>,
    pub cancel_after: Option<(usize, CancellationToken)>,
}

impl MockChatModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
            cancel_after: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new("")
        }
    }

    /// Replies normally but fires `token` once `calls` completions were served.
    pub fn cancelling_after(reply: &str, calls: usize, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((calls, token)),
            ..Self::new(reply)
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.prompt.clone())
            .collect()
    }
}

impl ChatModel for MockChatModel {
    type Error = anyhow::Error;

    async fn complete(&self, request: &ChatRequest) -> Result<String, Self::Error> {
        let served = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len()
        };

        if let Some((limit, token)) = &self.cancel_after {
            if served >= *limit {
                token.cancel();
            }
        }

        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.reply.clone())
    }
}
