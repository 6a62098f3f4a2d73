mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use sla_incentives::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
