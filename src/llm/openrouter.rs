/*
 *     Copyright (C) 2023  Fritz Ochsmann
 *
 *     This program is free software: you can redistribute it and/or modify
 *     it under the terms of the GNU Affero General Public License as published
 *     by the Free Software Foundation, either version 3 of the License, or
 *     (at your option) any later version.
 *
 *     This program is distributed in the hope that it will be useful,
 *     but WITHOUT ANY WARRANTY; without even the implied warranty of
 *     MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *     GNU Affero General Public License for more details.
 *
 *     You should have received a copy of the GNU Affero General Public License
 *     along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use async_trait::async_trait;
use reqwest::Client;

const REFERER: &str = "https://ezlife.app";
const TITLE: &str = "EzLife Task Estimator";

/// Client for the OpenRouter chat completions endpoint.
pub struct OpenRouterClient {
    api_key: String,
    url: String,
    http: Client,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize, Debug)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterClient {
    pub fn new(api_key: &str, url: &str) -> Result<Self, LlmError> {
        Ok(Self {
            api_key: api_key.to_owned(),
            url: url.to_owned(),
            http: Client::builder().build()?,
        })
    }

    fn build_request_body(request: &CompletionRequest) -> serde_json::Value {
        json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.prompt},
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let response = self
            .http
            .post(self.url.as_str())
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .timeout(request.timeout)
            .json(&Self::build_request_body(&request))
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    LlmError::Timeout(request.timeout)
                } else {
                    LlmError::Network(error)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            debug!("complete: rate limited");
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(%status, "complete: API error");
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|error| LlmError::InvalidResponse(error.to_string()))?;

        Ok(CompletionResponse {
            content: body
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
        })
    }
}
