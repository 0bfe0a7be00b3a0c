#[tokio::main]
async fn main() -> anyhow::Result<()> {
    signer_provider::app::run_cli().await
}
