// src/main.rs

#[tokio::main]
async fn main() {
    portal_engine::run().await;
}
