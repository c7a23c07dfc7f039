mod cli;
mod infra;
mod ledger;
mod routes;
mod server;

use cost_ledger::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
