use anyhow::Context;
use clap::{Parser, Subcommand};
use kraken_re::{Address, AddressSpec};
use tracing_subscriber::EnvFilter;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "kraken-re")]
#[command(about = "Inspect build target addresses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the addresses selected by an address spec (e.g. `src:`, `:foo`).
    Match {
        spec: String,

        /// Addresses in `directory:name` form.
        addresses: Vec<String>,

        /// JSON file holding an array of addresses.
        #[arg(long)]
        file: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Match {
            spec,
            addresses,
            file,
        } => {
            let spec = AddressSpec::of(&spec)?;

            // 1) Collect addresses from the command line, then from the file.
            let mut all = Vec::new();
            for raw in &addresses {
                all.push(Address::of(raw)?);
            }
            if let Some(path) = &file {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read address file {}", path))?;
                let from_file: Vec<Address> = serde_json::from_str(&text)
                    .with_context(|| format!("parse address file {}", path))?;
                all.extend(from_file);
            }

            // 2) Match.
            let matched: Vec<&Address> = all.iter().filter(|a| spec.matches_address(a)).collect();
            for address in &matched {
                println!("{}", address);
            }
            eprintln!("{} of {} addresses match {}", matched.len(), all.len(), spec);
        }
    }

    Ok(())
}
