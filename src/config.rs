use std::env;
use std::error::Error;
use std::fs::File;
use std::path::Path;

use log::info;
use serde::Deserialize;
use thiserror::Error;

/// Used when neither the command line nor a config file name any countries.
pub const DEFAULT_COUNTRIES: [&str; 2] = ["DE", "PL"];

/// Environment variable pointing to a country config file.
pub const CONFIG_FILE_VAR: &str = "BAROMETER_CONFIG_FILE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not defined in config")]
    MissingKey(&'static str),
    #[error("failed to open config file {path}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Country lists read from a JSON config file, e.g.
/// `{"from_countries": ["DE", "PL"], "to_countries": ["FR"]}`.
#[derive(Debug, Deserialize, PartialEq)]
pub struct CountryConfig {
    pub from_countries: Vec<String>,
    pub to_countries: Vec<String>,
}

#[derive(Deserialize)]
struct RawCountryConfig {
    from_countries: Option<Vec<String>>,
    to_countries: Option<Vec<String>>,
}

impl CountryConfig {
    /// Both keys must be present and hold a non-empty list.
    pub fn from_file(path: &str) -> Result<CountryConfig, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_string(),
            source,
        })?;
        let raw: RawCountryConfig =
            serde_json::from_reader(file).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            })?;
        let from_countries = match raw.from_countries {
            Some(xs) if !xs.is_empty() => xs,
            _ => return Err(ConfigError::MissingKey("from_countries")),
        };
        let to_countries = match raw.to_countries {
            Some(xs) if !xs.is_empty() => xs,
            _ => return Err(ConfigError::MissingKey("to_countries")),
        };
        Ok(CountryConfig {
            from_countries,
            to_countries,
        })
    }
}

/// Pick the country list: command line first, then the config file,
/// then the built-in default.
pub fn resolve_countries(cli: &[String], file: Option<&Vec<String>>) -> Vec<String> {
    if !cli.is_empty() {
        return cli.to_vec();
    }
    match file {
        Some(xs) => xs.clone(),
        None => DEFAULT_COUNTRIES.iter().map(|x| x.to_string()).collect(),
    }
}

/// Load `.env/{env}.env` into the process environment if it exists.
pub fn load_env(env_name: Option<&str>) -> Result<(), Box<dyn Error>> {
    let Some(name) = env_name else {
        return Ok(());
    };
    let path = format!(".env/{}.env", name);
    if Path::new(&path).exists() {
        dotenvy::from_path(Path::new(&path))?;
        info!("Loaded environment from {}", path);
    } else {
        info!("No environment file {}, skipping", path);
    }
    Ok(())
}

/// The config file named on the command line, or else the one named by
/// `BAROMETER_CONFIG_FILE`.
pub fn config_file_path(cli: Option<String>) -> Option<String> {
    cli.or_else(|| env::var(CONFIG_FILE_VAR).ok().filter(|x| !x.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn read_config_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("countries.json");
        fs::write(&path, r#"{"from_countries": ["DE"], "to_countries": ["FR", "IT"]}"#)?;
        let config = CountryConfig::from_file(path.to_str().unwrap())?;
        assert_eq!(config.from_countries, strings(&["DE"]));
        assert_eq!(config.to_countries, strings(&["FR", "IT"]));
        Ok(())
    }

    #[test]
    fn missing_config_key() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("countries.json");
        fs::write(&path, r#"{"from_countries": ["DE"]}"#)?;
        let err = CountryConfig::from_file(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "to_countries not defined in config");

        fs::write(&path, r#"{"from_countries": [], "to_countries": ["DE"]}"#)?;
        let err = CountryConfig::from_file(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("from_countries")));
        Ok(())
    }

    #[test]
    fn unreadable_config_file() {
        let err = CountryConfig::from_file("/nonexistent/countries.json").unwrap_err();
        assert!(matches!(err, ConfigError::Open { .. }));
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn malformed_config_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("countries.json");
        fs::write(&path, r#"{"from_countries": ["DE""#)?;
        let err = CountryConfig::from_file(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("failed to parse config file"));
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<serde_json::Error>().is_some());
        Ok(())
    }

    #[test]
    fn country_precedence() {
        let file = strings(&["FR"]);
        let cli = strings(&["IT", "ES"]);
        assert_eq!(resolve_countries(&cli, Some(&file)), cli);
        assert_eq!(resolve_countries(&[], Some(&file)), file);
        assert_eq!(resolve_countries(&[], None), strings(&["DE", "PL"]));
    }

    #[test]
    fn no_env_file() -> Result<(), Box<dyn Error>> {
        load_env(None)?;
        load_env(Some("does-not-exist"))?;
        Ok(())
    }
}
