use clap::Parser;
use std::path::PathBuf;
use tutor_invoices::{configuration::InvoiceConfiguration, error::ContextError, pipeline};

/// Consolidates the tutor session spreadsheet and writes one PDF invoice per tutor.
#[derive(Parser, Debug)]
#[command(version, long_about = None)]
struct CliArguments {
    /// JSON file overriding the default configuration.
    #[arg(short = 'c', long = "configuration", value_name = "json_file")]
    configuration_path: Option<PathBuf>,
    /// The spreadsheet with one row per session line.
    #[arg(short = 'i', long = "input", value_name = "xlsx_file")]
    input_path: Option<PathBuf>,
    /// Where to save the consolidated spreadsheet.
    #[arg(short = 't', long = "output-table", value_name = "xlsx_file")]
    output_table_path: Option<PathBuf>,
    /// The directory receiving the invoices.
    #[arg(short = 'o', long = "output-directory", value_name = "directory")]
    output_directory: Option<PathBuf>,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let arguments = CliArguments::parse();
    log::debug!("{:?}", arguments);

    let mut configuration = match &arguments.configuration_path {
        Some(configuration_path) => InvoiceConfiguration::from_path(configuration_path)?,
        None => InvoiceConfiguration::default(),
    };
    if let Some(input_path) = arguments.input_path {
        configuration.input_path = input_path;
    }
    if let Some(output_table_path) = arguments.output_table_path {
        configuration.consolidated_table_path = output_table_path;
    }
    if let Some(output_directory) = arguments.output_directory {
        configuration.output_directory = output_directory;
    }
    log::debug!("{:?}", configuration);

    let progress = pipeline::run(&configuration)?;
    log::info!("{}", progress.summary());

    Ok(())
}
