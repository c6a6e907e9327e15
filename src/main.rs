mod cli;

use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    cli::app::run().await?;
    Ok(())
}
