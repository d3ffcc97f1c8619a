use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use crate::{get_matrix::GetMatrixArgs, optimize::OptimizeArgs, schema::SchemaArgs};

mod file_utils;
mod get_matrix;
mod optimize;
mod parsers;
mod schema;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Solves a routing request and writes the JSON response
    #[command(visible_alias = "o")]
    Optimize {
        #[command(flatten)]
        args: OptimizeArgs,
    },
    /// Prints the cost matrix of a routing request
    Matrix {
        #[command(flatten)]
        args: GetMatrixArgs,
    },
    /// Prints the JSON schema of the request or of the response
    Schema {
        #[command(flatten)]
        args: SchemaArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    dotenvy::from_filename("./.env.local").ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Commands::Optimize { args } => optimize::run(args).await?,
        Commands::Matrix { args } => get_matrix::run(args).await?,
        Commands::Schema { args } => schema::run(args)?,
    }

    Ok(())
}
