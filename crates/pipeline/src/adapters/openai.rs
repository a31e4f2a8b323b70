use async_trait::async_trait;
use myteacher_openai::ChatClient;

use crate::error::PortError;
use crate::ports::{ChatCompleter, ChatReply, ChatUsage};

#[async_trait]
impl ChatCompleter for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<ChatReply, PortError> {
        let completion = ChatClient::complete(self, prompt).await?;
        Ok(ChatReply {
            text: completion.text,
            usage: ChatUsage {
                prompt_tokens: completion.usage.prompt_tokens,
                completion_tokens: completion.usage.completion_tokens,
            },
        })
    }
}
