mod cli;
mod infra;
mod routes;
mod server;

use suppression::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
