use std::{error::Error, path::Path};

use barometer::{
    config::load_env,
    db::{prod_db::ProdDb, timocom::barometer_archive::MergeSummary},
};
use clap::Parser;
use tabled::{builder::Builder, settings::Style};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input file, as written by download_barometer
    #[arg(short, long, alias = "input_file")]
    input_file: Option<String>,

    /// Output file for the monthly history
    #[arg(short, long, alias = "output_file")]
    output_file: Option<String>,

    /// Output file for all current data
    #[arg(short = 'n', long, alias = "output_file_now")]
    output_file_now: Option<String>,

    /// Environment name, loads .env/{env}.env if present
    #[arg(short, long)]
    env: Option<String>,
}

/// Make an ASCII table from the merge results
fn ascii_table(data: &[MergeSummary]) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec!["File", "Existing", "Kept", "New", "Total"]);
    for summary in data {
        builder.push_record(vec![
            summary.path.clone(),
            summary.existing.to_string(),
            summary.kept.to_string(),
            summary.new.to_string(),
            summary.total.to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    table
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    load_env(args.env.as_deref())?;

    let mut archive = ProdDb::timocom_barometer();
    if let Some(path) = args.input_file {
        archive.dump_path = path;
    }
    if let Some(path) = args.output_file {
        archive.monthly_path = path;
    }
    if let Some(path) = args.output_file_now {
        archive.now_path = path;
    }

    if !Path::new(&archive.dump_path).exists() {
        return Err(format!("Input file {} does not exist", archive.dump_path).into());
    }

    let summaries = archive.update_csv_files()?;
    println!("{}", ascii_table(&summaries));

    Ok(())
}
