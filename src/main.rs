use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process;

use msh_bindgen::{driver, Config};

#[derive(Parser, Debug)]
#[command(
    name = "msh-bindgen",
    version,
    about = "Generate Fortran and Python bindings from the meshly C API header"
)]
struct Cli {
    /// Path to the generation manifest.
    #[arg(long, default_value = "bindgen.toml")]
    manifest: PathBuf,
    /// Override the header path from the manifest.
    #[arg(long)]
    header: Option<PathBuf>,
}

fn main() {
    if let Err(err) = try_main(Cli::parse()) {
        eprintln!("error: {err:?}");
        process::exit(1);
    }
}

fn try_main(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.manifest)?;
    if let Some(header) = cli.header {
        config.header = header;
    }
    driver::run(&config)
}
