#[tokio::main]
async fn main() -> anyhow::Result<()> {
    webpilot_cli::cli::run().await
}
