use clap::Parser;
use dirsync::{Cli, Config};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::try_from(cli)?;
    let exit_code = dirsync::commands::run(config)?;
    std::process::exit(exit_code);
}
