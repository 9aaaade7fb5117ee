use clap::Parser as _;
use std::path::PathBuf;
use session_report_pdf::{
    configuration::ReportConfiguration, delivery::DirectoryDelivery, generator::ReportGenerator,
    report::SessionReport,
};

/// The command line arguments are the path of the JSON session report, an optional
/// configuration file and an optional output directory overriding the configured one.
#[derive(clap::Parser)]
struct CliArguments {
    /// The path of the JSON session report.
    #[arg(short = 'r', long = "report", value_name = "report_file")]
    report_path: PathBuf,
    /// The path of the JSON configuration file.
    #[arg(short = 'c', long = "config", value_name = "configuration_file")]
    configuration_path: Option<PathBuf>,
    /// The directory where the PDF file is saved.
    #[arg(short = 'o', long = "output", value_name = "output_directory")]
    output_directory: Option<PathBuf>,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli_arguments = CliArguments::parse();
    let configuration = match &cli_arguments.configuration_path {
        Some(configuration_path) => ReportConfiguration::from_path(configuration_path).unwrap(),
        None => ReportConfiguration::default(),
    };
    let report = SessionReport::from_path(&cli_arguments.report_path).unwrap();

    let mut delivery = match cli_arguments.output_directory {
        Some(output_directory) => DirectoryDelivery::new(output_directory),
        None => configuration.delivery(),
    };
    let outcome = ReportGenerator::new(configuration.to_generator_options())
        .generate_report(&report, &mut delivery);

    // The outcome is printed the same way it is returned to the application
    println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
    if !outcome.is_success() {
        std::process::exit(1);
    }
}
