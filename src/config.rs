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

use lazy_static::lazy_static;
use std::path::PathBuf;

lazy_static! {
    /// Models tried in order for a duration estimate. The first one is used for breakdowns.
    pub static ref DEFAULT_MODELS: Vec<String> = vec![
        "mistralai/mistral-7b-instruct".to_owned(),
        "google/palm-2-chat-bison".to_owned(),
        "anthropic/claude-instant-v1".to_owned(),
        "openai/gpt-3.5-turbo".to_owned(),
    ];
}

/// Process configuration, read once from the environment at startup.
#[derive(Deserialize, Debug, Clone, Getters, Setters)]
#[get = "pub"]
#[set = "pub"]
pub struct Config {
    #[serde(default = "default_database_endpoint")]
    database_endpoint: String,
    database_username: Option<String>,
    database_password: Option<String>,
    #[serde(default = "default_database_namespace")]
    database_namespace: String,
    #[serde(default = "default_database_name")]
    database_name: String,
    #[serde(default = "default_bind_address")]
    bind_address: String,
    openrouter_api_key: Option<String>,
    #[serde(default = "default_openrouter_api_url")]
    openrouter_api_url: String,
    #[serde(default = "default_estimation_models")]
    estimation_models: Vec<String>,
    #[serde(default = "default_estimation_retry_delay_ms")]
    estimation_retry_delay_ms: u64,
    estimation_service_url: Option<String>,
    #[serde(default = "default_estimation_timeout_secs")]
    estimation_timeout_secs: u64,
    #[serde(default = "default_upload_dir")]
    upload_dir: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    max_upload_bytes: usize,
    #[serde(default = "default_session_length_secs")]
    session_length_secs: i64,
    #[serde(default)]
    seed_test_user: bool,
}

fn default_database_endpoint() -> String {
    "mem://".to_owned()
}

fn default_database_namespace() -> String {
    "ezlife".to_owned()
}

fn default_database_name() -> String {
    "ezlife".to_owned()
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_owned()
}

fn default_openrouter_api_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_owned()
}

fn default_estimation_models() -> Vec<String> {
    DEFAULT_MODELS.clone()
}

fn default_estimation_retry_delay_ms() -> u64 {
    1000
}

fn default_estimation_timeout_secs() -> u64 {
    120
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_bytes() -> usize {
    // 10 MiB
    10 * 1024 * 1024
}

fn default_session_length_secs() -> i64 {
    // 24h
    86400
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_endpoint: default_database_endpoint(),
            database_username: None,
            database_password: None,
            database_namespace: default_database_namespace(),
            database_name: default_database_name(),
            bind_address: default_bind_address(),
            openrouter_api_key: None,
            openrouter_api_url: default_openrouter_api_url(),
            estimation_models: default_estimation_models(),
            estimation_retry_delay_ms: default_estimation_retry_delay_ms(),
            estimation_service_url: None,
            estimation_timeout_secs: default_estimation_timeout_secs(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            session_length_secs: default_session_length_secs(),
            seed_test_user: false,
        }
    }
}

impl Config {
    pub fn from_env() -> std::result::Result<Self, envy::Error> {
        envy::from_env::<Config>()
    }

    /// The api key, if one is set and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.openrouter_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// The peer estimation service, if one is set and not blank.
    pub fn estimation_peer(&self) -> Option<&str> {
        self.estimation_service_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}
