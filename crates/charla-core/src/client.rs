use anyhow::{anyhow, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(rename = "chatInput")]
    chat_input: ChatInput<'a>,
}

#[derive(Serialize)]
struct ChatInput<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatReply {
    // Decoding as String rejects a nested object or number in `output`,
    // which counts as a malformed reply. Extra fields are ignored.
    output: String,
}

/// HTTP client for webhook chat endpoints.
///
/// Both the handshake probe and conversation turns use the same wire
/// exchange: `POST <url>` with a JSON body `{"chatInput": {"message": ...}}`,
/// answered by `{"output": "<reply>"}`.
#[derive(Clone, Default)]
pub struct ChatClient {
    client: Client,
}

impl ChatClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Send the handshake body and require an HTTP 200.
    ///
    /// The reply body is ignored; a probe retains nothing from the response.
    pub async fn handshake(&self, url: &str, message: &str) -> Result<()> {
        let response = self.post_message(url, message).send().await?;

        if response.status() != StatusCode::OK {
            return Err(anyhow!(
                "handshake with {} returned status {}",
                url,
                response.status()
            ));
        }

        Ok(())
    }

    /// Send one conversation message and return the reply text from the
    /// `output` field.
    pub async fn send_message(&self, url: &str, message: &str) -> Result<String> {
        let response = self.post_message(url, message).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "message to {} returned status {}",
                url,
                response.status()
            ));
        }

        let reply: ChatReply = response.json().await?;
        Ok(reply.output)
    }

    fn post_message(&self, url: &str, message: &str) -> reqwest::RequestBuilder {
        self.client.post(url).json(&ChatRequest {
            chat_input: ChatInput { message },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_the_wire_format() {
        let body = serde_json::to_string(&ChatRequest {
            chat_input: ChatInput { message: "Ping" },
        })
        .unwrap();

        assert_eq!(body, r#"{"chatInput":{"message":"Ping"}}"#);
    }

    #[test]
    fn reply_decoding_requires_a_string_output() {
        let reply: ChatReply =
            serde_json::from_str(r#"{"output": "Hi there", "extra": 1}"#).unwrap();
        assert_eq!(reply.output, "Hi there");

        assert!(serde_json::from_str::<ChatReply>(r#"{"output": {"text": "Hi"}}"#).is_err());
        assert!(serde_json::from_str::<ChatReply>(r#"{"output": 42}"#).is_err());
        assert!(serde_json::from_str::<ChatReply>(r#"{"reply": "Hi"}"#).is_err());
    }
}
