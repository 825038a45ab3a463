#[tokio::main]
async fn main() -> anyhow::Result<()> {
    proxy_gateway_lib::run().await
}
