// src/llm/http_provider.rs
// Reqwest-backed LLM provider speaking an OpenAI-compatible chat-completions
// API, including its SSE streaming format.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::{json, Value};

use super::{CompletionRequest, LlmProvider, LlmStreamEvent, Message, Role};

pub struct HttpLlmProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HttpLlmProvider {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model,
        }
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn body(&self, req: &CompletionRequest, stream: bool) -> Value {
        let mut messages = vec![json!({"role": "system", "content": req.system})];
        messages.extend(req.messages.iter().map(|m: &Message| {
            json!({"role": Self::role_str(m.role), "content": m.content})
        }));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": stream,
        });
        if req.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<String> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.body(&req, false))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM provider returned {}: {}", status, text);
        }

        let payload: Value = response.json().await?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("LLM response missing content"))?;

        Ok(content.to_string())
    }

    fn stream(&self, req: CompletionRequest) -> BoxStream<'static, LlmStreamEvent> {
        let client = self.client.clone();
        let api_url = self.api_url.clone();
        let api_key = self.api_key.clone();
        let body = self.body(&req, true);

        let stream = async_stream::stream! {
            let response = match client
                .post(&api_url)
                .bearer_auth(&api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    yield LlmStreamEvent::Error(e.to_string());
                    return;
                }
            };

            if !response.status().is_success() {
                yield LlmStreamEvent::Error(format!("LLM provider returned {}", response.status()));
                return;
            }

            let mut input_tokens = 0i64;
            let mut output_tokens = 0i64;
            let mut byte_stream = response.bytes_stream();
            let mut buf = String::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield LlmStreamEvent::Error(e.to_string());
                        return;
                    }
                };
                buf.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = buf.find('\n') {
                    let line = buf[..pos].trim_end_matches('\r').to_string();
                    buf.drain(..=pos);

                    let Some(event) = parse_sse_line(&line, &mut input_tokens, &mut output_tokens) else {
                        continue;
                    };
                    yield event;
                }
            }

            yield LlmStreamEvent::Done { input_tokens, output_tokens };
        };

        Box::pin(stream)
    }
}

/// Parses one SSE "data: {...}" line into a stream event. Mirrors the
/// `data:`/`[DONE]` framing used by OpenAI-compatible chat-completions APIs.
fn parse_sse_line(line: &str, input_tokens: &mut i64, output_tokens: &mut i64) -> Option<LlmStreamEvent> {
    let data = line.strip_prefix("data: ")?;
    if data == "[DONE]" {
        return None;
    }

    let json: Value = serde_json::from_str(data).ok()?;

    if let Some(usage) = json.get("usage") {
        *input_tokens = usage.get("prompt_tokens").and_then(|v| v.as_i64()).unwrap_or(*input_tokens);
        *output_tokens = usage.get("completion_tokens").and_then(|v| v.as_i64()).unwrap_or(*output_tokens);
    }

    let delta = json.pointer("/choices/0/delta/content").and_then(|v| v.as_str())?;
    Some(LlmStreamEvent::TextDelta(delta.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_text_delta_line() {
        let mut i = 0;
        let mut o = 0;
        let line = r#"data: {"choices":[{"delta":{"content":"hi"}}]}"#;
        match parse_sse_line(line, &mut i, &mut o) {
            Some(LlmStreamEvent::TextDelta(d)) => assert_eq!(d, "hi"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn treats_done_marker_as_no_event() {
        let mut i = 0;
        let mut o = 0;
        assert!(parse_sse_line("data: [DONE]", &mut i, &mut o).is_none());
    }
}
