#[tokio::main]
async fn main() {
    if let Err(e) = erp_guide_lib::run().await {
        eprintln!("erp-guide: {e}");
        std::process::exit(1);
    }
}
