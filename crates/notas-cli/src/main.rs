mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::RunArgs;

#[derive(Parser)]
#[command(
    name = "notas",
    version,
    about = "Invoice table extraction for municipal service-tax (ISS) PDF reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the invoice table and export it as XLSX, CSV or JSON
    Extract {
        /// Path to the PDF report
        input_file: PathBuf,

        /// Output file (default: the PDF path with the format's extension)
        #[arg(short = 'o', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Output format: xlsx, csv or json (default: from --out, else xlsx)
        #[arg(short, long)]
        format: Option<String>,

        /// Leave the document banner out of CSV exports
        #[arg(long)]
        no_banner: bool,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Show the raw tables each strategy finds and which ones carry invoices
    Tables {
        /// Path to the PDF report
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Print invoice counts and tax totals per accounting period
    Summary {
        /// Path to the PDF report
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        #[command(flatten)]
        run: RunArgs,
    },
}

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input_file,
            out,
            format,
            no_banner,
            run,
        } => commands::extract::run(input_file, out, format.as_deref(), no_banner, &run),
        Commands::Tables {
            input_file,
            output,
            run,
        } => commands::tables::run(input_file, &output, &run),
        Commands::Summary {
            input_file,
            output,
            run,
        } => commands::summary::run(input_file, &output, &run),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
