//! The estf-cloud CLI.

use std::io::Write;

use anyhow::Result;
use structopt::StructOpt;

use estf_cloud::EstfCloud;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = EstfCloud::from_args();
    let res = cli.run().await;

    // Ensure any pending output is flushed.
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    res
}
