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

#[macro_use]
extern crate serde;
#[macro_use]
extern crate thiserror;
#[macro_use]
extern crate getset;
#[macro_use]
extern crate tracing;
#[macro_use]
extern crate serde_json;

use crate::prelude::*;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod auth;
mod config;
mod database;
mod error;
mod estimation;
mod llm;
mod routes;
mod state;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);
    let connection = database::connect(&config).await?;

    if *config.seed_test_user() {
        database::definitions::account::seed_test_account(&connection).await?;
    }

    let state = ApplicationState::new(connection, config.clone())?;
    if !state.estimator().ai_configured() {
        warn!("OPENROUTER_API_KEY is not set, estimations will use the heuristic fallback");
    }

    let (sender, receiver) = kanal::unbounded_async::<()>();
    let listener = tokio::net::TcpListener::bind(config.bind_address().as_str()).await?;
    info!("Listening on {}", listener.local_addr()?);

    let server = tokio::spawn(async move {
        axum::serve(listener, routes::router(state))
            .with_graceful_shutdown(async move {
                receiver.recv().await.ok();
            })
            .await
    });

    if let Err(error) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for shutdown signal: {}", error);
    }

    info!("Received shutdown signal... Shutting down...");
    // shutdown
    sender.send(()).await?;
    server.await??;

    Ok(())
}

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::database::id::Id;
    pub use crate::database::DatabaseConnection;
    pub use crate::error::*;
    pub use crate::routes::extractor::Json;
    pub use crate::require_session;
    pub use crate::sql_span;
    pub use crate::state::ApplicationState;
}
