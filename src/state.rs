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

use crate::estimation::client::EstimationBackend;
use crate::estimation::Estimator;
use crate::prelude::*;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApplicationState {
    connection: DatabaseConnection,
    config: Arc<Config>,
    estimator: Arc<Estimator>,
    estimation: EstimationBackend,
}

impl ApplicationState {
    pub fn new(connection: DatabaseConnection, config: Arc<Config>) -> Result<Self> {
        let estimator = Estimator::from_config(&config)?;

        Self::with_estimator(connection, config, estimator)
    }

    pub fn with_estimator(
        connection: DatabaseConnection,
        config: Arc<Config>,
        estimator: Estimator,
    ) -> Result<Self> {
        let estimator = Arc::new(estimator);
        let estimation = EstimationBackend::from_config(&config, estimator.clone())?;

        Ok(Self {
            connection,
            config,
            estimator,
            estimation,
        })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The in-process estimator, serving `/estimate_time`.
    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// The backend task creation asks for estimates.
    pub fn estimation(&self) -> &EstimationBackend {
        &self.estimation
    }
}
