use std::{error::Error, time::Duration};

use barometer::{
    config::{config_file_path, load_env, resolve_countries, CountryConfig},
    db::{prod_db::ProdDb, timocom::barometer_archive::API_BASE},
};
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Base URL of API
    #[arg(long, alias = "api_base", default_value = API_BASE)]
    api_base: String,

    /// JSON config file with from_countries and to_countries
    #[arg(long, alias = "config_file")]
    config_file: Option<String>,

    /// From countries, repeat for several.  Overrides the config file
    #[arg(short, long, alias = "from_countries")]
    from_countries: Vec<String>,

    /// To countries, repeat for several.  Overrides the config file
    #[arg(short, long, alias = "to_countries")]
    to_countries: Vec<String>,

    /// How to combine the from and to lists; cross, zip
    #[arg(short, long, default_value = "cross")]
    combine: String,

    /// Waiting seconds between queries
    #[arg(short = 's', long, default_value_t = 3)]
    wait: u64,

    /// Target file, a .gz extension compresses it
    #[arg(short, long)]
    dump: Option<String>,

    /// Environment name, loads .env/{env}.env if present
    #[arg(short, long)]
    env: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    load_env(args.env.as_deref())?;

    let config = match config_file_path(args.config_file) {
        Some(path) => Some(CountryConfig::from_file(&path)?),
        None => None,
    };
    let from_countries = resolve_countries(
        &args.from_countries,
        config.as_ref().map(|c| &c.from_countries),
    );
    let to_countries = resolve_countries(
        &args.to_countries,
        config.as_ref().map(|c| &c.to_countries),
    );

    let mut archive = ProdDb::timocom_barometer();
    if let Some(dump) = args.dump {
        archive.dump_path = dump;
    }

    let client = reqwest::blocking::Client::new();
    let n = archive.download(
        &client,
        &args.api_base,
        &from_countries,
        &to_countries,
        &args.combine,
        Duration::from_secs(args.wait),
    )?;
    info!("Downloaded {} lanes", n);

    Ok(())
}
