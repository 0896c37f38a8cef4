//! Fulfillment Worker Service - Entry Point
//!
//! Accepts subscription events over HTTP and fulfils them in the background.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    zerg_fulfillment_worker::run().await
}
