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

use crate::estimation::breakdown::{self, BreakdownItem, WorkCalendar};
use crate::estimation::extract::{self, Extraction};
use crate::estimation::EstimationRequest;
use crate::llm::{CompletionRequest, LlmClient, LlmError};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

const MINUTES_SYSTEM_PROMPT: &str = "You are a task time estimation assistant. Respond ONLY with \
    a numerical estimate in minutes for how long the task would take an average person. Give a \
    single number only, no explanations or additional text.";

const BREAKDOWN_SYSTEM_PROMPT: &str = "You are a task planning assistant. Break the given task \
    down into daily chunks and describe what should be done on each day. Respond with JSON of \
    the following structure:
[
    {\"day\": \"Day 1\", \"hours\": hours_for_day_1, \"summary\": \"specific subtasks for day 1\"},
    {\"day\": \"Day 2\", \"hours\": hours_for_day_2, \"summary\": \"specific subtasks for day 2\"}
]
The hours must add up to the total hours of the task and respect the hours per day limit. Every \
summary should name concrete, actionable subtasks and the outcome expected for that day. Order \
the work logically and leave room for planning and review.";

const MINUTES_TEMPERATURE: f32 = 0.1;
const MINUTES_MAX_TOKENS: u32 = 10;
const MINUTES_TIMEOUT: Duration = Duration::from_secs(15);

const BREAKDOWN_TEMPERATURE: f32 = 0.7;
const BREAKDOWN_MAX_TOKENS: u32 = 1500;
const BREAKDOWN_TIMEOUT: Duration = Duration::from_secs(45);

/// Model backed estimation. Estimates walk the model list in order, breakdowns ask the first
/// model only and fall back to the synthesizer.
pub struct AiEstimator {
    client: Arc<dyn LlmClient>,
    models: Vec<String>,
    retry_delay: Duration,
}

impl AiEstimator {
    pub fn new(client: Arc<dyn LlmClient>, models: Vec<String>, retry_delay: Duration) -> Self {
        Self {
            client,
            models,
            retry_delay,
        }
    }

    /// Duration and breakdown, `None` if no model produced a usable duration.
    pub async fn estimate(
        &self,
        request: &EstimationRequest,
        today: NaiveDate,
    ) -> Option<(u32, Vec<BreakdownItem>)> {
        let minutes = self.estimate_minutes(&request.description).await?;
        let breakdown = self
            .breakdown(
                &request.description,
                minutes,
                request.days_per_week,
                request.hours_per_day,
                today,
            )
            .await;

        Some((minutes, breakdown))
    }

    #[instrument(skip_all)]
    pub async fn estimate_minutes(&self, description: &str) -> Option<u32> {
        for (index, model) in self.models.iter().enumerate() {
            match self.request_minutes(model, description).await {
                Ok(minutes) => {
                    info!(%model, minutes, "Estimated task duration");
                    return Some(minutes);
                }
                Err(error) => {
                    warn!(%model, %error, "Model failed to estimate the task duration");

                    if index + 1 < self.models.len() && !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        error!("All models failed to estimate the task duration");
        None
    }

    async fn request_minutes(&self, model: &str, description: &str) -> Result<u32, LlmError> {
        let response = self
            .client
            .complete(CompletionRequest {
                model: model.to_owned(),
                system_prompt: MINUTES_SYSTEM_PROMPT.to_owned(),
                prompt: format!("How many minutes would it take to complete this task: {description}"),
                temperature: MINUTES_TEMPERATURE,
                max_tokens: MINUTES_MAX_TOKENS,
                timeout: MINUTES_TIMEOUT,
            })
            .await?;
        let reply = response
            .content
            .ok_or_else(|| LlmError::InvalidResponse("empty reply".to_owned()))?;

        match extract::minutes(reply.trim()) {
            Extraction::Parsed(minutes) => Ok(minutes),
            Extraction::Unrecoverable(reason) => Err(LlmError::InvalidResponse(reason)),
        }
    }

    /// Breakdown of the estimated total. Falls back to the synthesized breakdown for missing
    /// schedules and for any model failure.
    #[instrument(skip_all)]
    pub async fn breakdown(
        &self,
        description: &str,
        total_minutes: u32,
        days_per_week: Option<u32>,
        hours_per_day: Option<f64>,
        today: NaiveDate,
    ) -> Vec<BreakdownItem> {
        let synthesized = || {
            breakdown::synthesize(
                description,
                i64::from(total_minutes),
                days_per_week,
                hours_per_day,
                today,
            )
        };

        let (Some((days, hours)), Some(model)) = (
            breakdown::valid_schedule(days_per_week, hours_per_day),
            self.models.first(),
        ) else {
            return synthesized();
        };

        match self
            .request_breakdown(model, description, total_minutes, days, hours, today)
            .await
        {
            Ok(items) => {
                info!(%model, days = items.len(), "Generated task breakdown");
                items
            }
            Err(error) => {
                warn!(%model, %error, "Falling back to the synthesized breakdown");
                synthesized()
            }
        }
    }

    async fn request_breakdown(
        &self,
        model: &str,
        description: &str,
        total_minutes: u32,
        days_per_week: u32,
        hours_per_day: f64,
        today: NaiveDate,
    ) -> Result<Vec<BreakdownItem>, LlmError> {
        let total_hours = f64::from(total_minutes) / 60.0;
        let days_needed = (total_hours / hours_per_day).max(0.1).round().max(1.0);
        let prompt = format!(
            "Task description: {description}\n\
             Total estimated hours: {total_hours:.1} hours\n\
             Days per week: {days_per_week}\n\
             Hours per day: {hours_per_day}\n\n\
             Break this down into {days_needed} days of work, with each day having at most \
             {hours_per_day} hours. Make sure the summaries are specific to the task described."
        );

        let response = self
            .client
            .complete(CompletionRequest {
                model: model.to_owned(),
                system_prompt: BREAKDOWN_SYSTEM_PROMPT.to_owned(),
                prompt,
                temperature: BREAKDOWN_TEMPERATURE,
                max_tokens: BREAKDOWN_MAX_TOKENS,
                timeout: BREAKDOWN_TIMEOUT,
            })
            .await?;
        let reply = response
            .content
            .ok_or_else(|| LlmError::InvalidResponse("empty reply".to_owned()))?;

        match extract::breakdown(&reply, WorkCalendar::new(today, days_per_week)) {
            Extraction::Parsed(items) => Ok(items),
            Extraction::Unrecoverable(reason) => Err(LlmError::InvalidResponse(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::breakdown::DayChunk;
    use crate::llm::client::mock::{MockLlmClient, MockReply};

    const MODELS: [&str; 3] = ["first/model", "second/model", "third/model"];

    fn estimator(replies: Vec<MockReply>) -> (Arc<MockLlmClient>, AiEstimator) {
        let client = Arc::new(MockLlmClient::new(replies));
        let estimator = AiEstimator::new(
            client.clone(),
            MODELS.iter().map(|model| model.to_string()).collect(),
            Duration::ZERO,
        );

        (client, estimator)
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
    }

    #[tokio::test]
    async fn test_first_answer_wins() {
        let (client, estimator) = estimator(vec![MockReply::text("About 45 minutes")]);

        assert_eq!(estimator.estimate_minutes("Write report").await, Some(45));
        assert_eq!(client.models(), vec!["first/model"]);

        let request = &client.requests()[0];
        assert_eq!(
            request.prompt,
            "How many minutes would it take to complete this task: Write report"
        );
        assert_eq!(request.max_tokens, 10);
        assert_eq!(request.timeout, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_models_are_tried_in_order() {
        let (client, estimator) = estimator(vec![
            MockReply::Status(503),
            MockReply::text("no idea"),
            MockReply::text("60"),
        ]);

        assert_eq!(estimator.estimate_minutes("Study").await, Some(60));
        assert_eq!(client.models(), MODELS.to_vec());
    }

    #[tokio::test]
    async fn test_all_models_fail() {
        let (client, estimator) = estimator(vec![
            MockReply::text("0"),
            MockReply::Empty,
            MockReply::Status(500),
        ]);

        assert_eq!(estimator.estimate_minutes("Study").await, None);
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_implausible_estimate_is_capped() {
        let (_, estimator) = estimator(vec![MockReply::text("100000")]);

        assert_eq!(estimator.estimate_minutes("Study").await, Some(120));
    }

    #[tokio::test]
    async fn test_breakdown_from_model() {
        let (client, estimator) = estimator(vec![
            MockReply::text("180"),
            MockReply::text(
                r#"Here you go: [{"day": "Day 1", "hours": 2, "summary": "Research sources"}, {"day": "Day 2", "hours": 1, "summary": "Write it"}]"#,
            ),
        ]);
        let request = EstimationRequest {
            description: "Write report".to_owned(),
            days_per_week: Some(5),
            hours_per_day: Some(2.0),
        };

        let (minutes, items) = estimator.estimate(&request, monday()).await.unwrap();
        assert_eq!(minutes, 180);
        assert_eq!(
            items[1],
            BreakdownItem::Day(DayChunk {
                day: "Day 2".to_owned(),
                date: NaiveDate::from_ymd_opt(2026, 10, 13).unwrap(),
                hours: 1.0,
                summary: "Write it".to_owned(),
                completed: false,
            })
        );

        let breakdown_request = &client.requests()[1];
        assert_eq!(breakdown_request.model, "first/model");
        assert_eq!(breakdown_request.max_tokens, 1500);
        assert!(breakdown_request.prompt.contains("Break this down into 2 days"));
    }

    #[tokio::test]
    async fn test_breakdown_falls_back() {
        let (_, estimator) = estimator(vec![
            MockReply::text("300"),
            MockReply::text("I would rather not."),
        ]);
        let request = EstimationRequest {
            description: "Write report".to_owned(),
            days_per_week: Some(5),
            hours_per_day: Some(2.0),
        };

        let (minutes, items) = estimator.estimate(&request, monday()).await.unwrap();
        assert_eq!(minutes, 300);
        assert_eq!(
            items,
            breakdown::synthesize("Write report", 300, Some(5), Some(2.0), monday())
        );
    }

    #[tokio::test]
    async fn test_breakdown_without_schedule() {
        let (client, estimator) = estimator(vec![MockReply::text("90")]);
        let request = EstimationRequest {
            description: "Write report".to_owned(),
            days_per_week: None,
            hours_per_day: None,
        };

        let (_, items) = estimator.estimate(&request, monday()).await.unwrap();
        assert_eq!(items.len(), 1);
        // no breakdown request without a schedule
        assert_eq!(client.call_count(), 1);
    }
}
