use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    speak_gateway::cli::app::run().await
}
