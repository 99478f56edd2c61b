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

use crate::estimation::{EstimationRequest, EstimationResult, Estimator};
use crate::prelude::*;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Where task creation gets its estimates from, the in-process estimator or a peer
/// estimation service.
#[derive(Clone)]
pub enum EstimationBackend {
    Local(Arc<Estimator>),
    Remote { http: reqwest::Client, url: String },
}

impl EstimationBackend {
    pub fn from_config(config: &Config, estimator: Arc<Estimator>) -> Result<Self> {
        match config.estimation_peer() {
            Some(url) => {
                let http = reqwest::Client::builder()
                    .timeout(Duration::from_secs(*config.estimation_timeout_secs()))
                    .build()?;

                Ok(Self::Remote {
                    http,
                    url: format!("{}/estimate_time", url.trim_end_matches('/')),
                })
            }
            None => Ok(Self::Local(estimator)),
        }
    }

    /// `None` if the peer could not be reached or answered with garbage.
    #[instrument(skip_all)]
    pub async fn estimate(&self, request: &EstimationRequest) -> Option<EstimationResult> {
        match self {
            EstimationBackend::Local(estimator) => {
                Some(estimator.estimate(request, Utc::now().date_naive()).await)
            }
            EstimationBackend::Remote { http, url } => {
                match Self::request(http, url, request).await {
                    Ok(result) => Some(result),
                    Err(error) => {
                        warn!(%url, %error, "Estimation service request failed");
                        None
                    }
                }
            }
        }
    }

    async fn request(
        http: &reqwest::Client,
        url: &str,
        request: &EstimationRequest,
    ) -> std::result::Result<EstimationResult, reqwest::Error> {
        http.post(url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<EstimationResult>()
            .await
    }
}
