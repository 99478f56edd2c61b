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

use crate::estimation::ai::AiEstimator;
use crate::estimation::breakdown::BreakdownItem;
use crate::llm::OpenRouterClient;
use crate::prelude::*;
use chrono::NaiveDate;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use strum::{AsRefStr, Display};

pub mod ai;
pub mod breakdown;
pub mod client;
pub mod extract;
pub mod heuristic;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EstimationRequest {
    pub description: String,
    #[serde(default)]
    pub days_per_week: Option<u32>,
    #[serde(default)]
    pub hours_per_day: Option<f64>,
}

/// Where an estimate came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Source {
    Ai,
    Fallback,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EstimationResult {
    pub estimated_minutes: u32,
    pub breakdown: Vec<BreakdownItem>,
    pub source: Source,
}

/// Estimates durations and breakdowns. Always answers, the heuristic covers every failure of
/// the models.
pub struct Estimator {
    ai: Option<AiEstimator>,
}

impl Estimator {
    pub fn new(ai: Option<AiEstimator>) -> Self {
        Self { ai }
    }

    /// The model backed estimator is only set up with an api key.
    pub fn from_config(config: &Config) -> Result<Self> {
        let ai = match config.api_key() {
            Some(api_key) => {
                let client = OpenRouterClient::new(api_key, config.openrouter_api_url())?;

                Some(AiEstimator::new(
                    Arc::new(client),
                    config.estimation_models().clone(),
                    Duration::from_millis(*config.estimation_retry_delay_ms()),
                ))
            }
            None => None,
        };

        Ok(Self::new(ai))
    }

    pub fn ai_configured(&self) -> bool {
        self.ai.is_some()
    }

    #[instrument(skip_all)]
    pub async fn estimate(&self, request: &EstimationRequest, today: NaiveDate) -> EstimationResult {
        if let Some(ai) = &self.ai {
            match AssertUnwindSafe(ai.estimate(request, today))
                .catch_unwind()
                .await
            {
                Ok(Some((estimated_minutes, breakdown))) => {
                    return EstimationResult {
                        estimated_minutes,
                        breakdown,
                        source: Source::Ai,
                    }
                }
                Ok(None) => warn!("No model produced an estimate, using the heuristic"),
                Err(_) => error!("Model estimation panicked, using the heuristic"),
            }
        }

        fallback(request, today)
    }
}

/// Heuristic duration with the synthesized breakdown.
pub fn fallback(request: &EstimationRequest, today: NaiveDate) -> EstimationResult {
    let estimated_minutes = heuristic::estimate(&request.description);
    let breakdown = breakdown::synthesize(
        &request.description,
        i64::from(estimated_minutes),
        request.days_per_week,
        request.hours_per_day,
        today,
    );

    EstimationResult {
        estimated_minutes,
        breakdown,
        source: Source::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::{MockLlmClient, MockReply};

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
    }

    fn with_replies(replies: Vec<MockReply>) -> Estimator {
        Estimator::new(Some(AiEstimator::new(
            Arc::new(MockLlmClient::new(replies)),
            vec!["only/model".to_owned()],
            Duration::ZERO,
        )))
    }

    fn request() -> EstimationRequest {
        EstimationRequest {
            description: "Write report".to_owned(),
            days_per_week: Some(5),
            hours_per_day: Some(2.0),
        }
    }

    #[tokio::test]
    async fn test_without_ai() {
        let estimator = Estimator::new(None);
        let result = estimator.estimate(&request(), monday()).await;

        assert!(!estimator.ai_configured());
        assert_eq!(result.source, Source::Fallback);
        assert_eq!(result.estimated_minutes, 120);
        assert_eq!(result.breakdown.len(), 1);
    }

    #[tokio::test]
    async fn test_with_ai() {
        let estimator = with_replies(vec![MockReply::text("240"), MockReply::Status(500)]);
        let result = estimator.estimate(&request(), monday()).await;

        assert_eq!(result.source, Source::Ai);
        assert_eq!(result.estimated_minutes, 240);
        assert_eq!(result.breakdown.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_ai() {
        let estimator = with_replies(vec![MockReply::text("nothing")]);
        let result = estimator.estimate(&request(), monday()).await;

        assert_eq!(result, fallback(&request(), monday()));
    }

    #[tokio::test]
    async fn test_panicking_ai() {
        let estimator = with_replies(vec![MockReply::Panic]);
        let result = estimator.estimate(&request(), monday()).await;

        assert_eq!(result.source, Source::Fallback);
        assert_eq!(result.estimated_minutes, 120);
    }

    #[test]
    fn test_source_names() {
        assert_eq!(Source::Ai.as_ref(), "ai");
        assert_eq!(Source::Fallback.to_string(), "fallback");
        assert_eq!(
            serde_json::to_value(Source::Fallback).unwrap(),
            json!("fallback")
        );
    }

    #[test]
    fn test_config_without_key() {
        let estimator = Estimator::from_config(&Config::default()).unwrap();

        assert!(!estimator.ai_configured());
    }
}
