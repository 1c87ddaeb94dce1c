#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gazetrack_lib::run().await
}
