use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    webuiflasher::cli::run().await
}
