use clap::Parser;
use swasthya_client::{Cli, run};

#[tokio::main]
async fn main() -> Result<(), swasthya_client::AppError> {
    run(Cli::parse()).await
}
