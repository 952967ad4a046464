//! IMG.LY Background Compositing CLI Tool
//!
//! Command-line interface for placing cut-out foregrounds onto solid colors
//! or background images with the imgly-bgcomposite library.

#[cfg(feature = "cli")]
use imgly_bgcomposite::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
