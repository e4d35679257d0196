use clap::Parser;
use dotenvy::dotenv;

use viewable::cli::{self, Cli};
use viewable::ApplicationError;

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let cli = Cli::parse();

    cli::run(cli).await
}
