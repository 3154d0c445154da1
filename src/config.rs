use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 3000;

/// Runtime settings. Flags win over environment variables, which win over
/// defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub port: u16,
    /// CSV catalog to use instead of the built-in word list.
    pub catalog: Option<PathBuf>,
}

impl Config {
    /// Splits global options out of `args` and returns the config plus the
    /// remaining arguments (command first).
    pub fn resolve<F>(args: &[String], env: F) -> Result<(Config, Vec<String>), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut data_dir = env("WORDWISE_DATA_DIR").map(PathBuf::from);
        let mut catalog = env("WORDWISE_CATALOG").map(PathBuf::from);
        let mut port = match env("WORDWISE_PORT") {
            Some(p) => parse_port(&p)?,
            None => DEFAULT_PORT,
        };

        let mut rest = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            match arg {
                "--data-dir" | "--catalog" | "-p" | "--port" => {
                    let value = args
                        .get(i + 1)
                        .ok_or_else(|| ConfigError::MissingValue(arg.to_string()))?;
                    match arg {
                        "--data-dir" => data_dir = Some(PathBuf::from(value)),
                        "--catalog" => catalog = Some(PathBuf::from(value)),
                        _ => port = parse_port(value)?,
                    }
                    i += 2;
                }
                _ => {
                    if let Some(path) = arg.strip_prefix("--data-dir=") {
                        data_dir = Some(PathBuf::from(path));
                    } else {
                        rest.push(args[i].clone());
                    }
                    i += 1;
                }
            }
        }

        let data_dir = match data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        Ok((
            Config {
                data_dir,
                port,
                catalog,
            },
            rest,
        ))
    }
}

fn parse_port(s: &str) -> Result<u16, ConfigError> {
    s.parse().map_err(|_| ConfigError::InvalidPort(s.to_string()))
}

fn default_data_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("", "", "wordwise")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoDataDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|a| a.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn flags_are_split_from_command() {
        let (config, rest) = Config::resolve(
            &args(&["--data-dir", "/tmp/w", "serve", "-p", "8080"]),
            no_env,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/w"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.catalog, None);
        assert_eq!(rest, args(&["serve"]));
    }

    #[test]
    fn environment_fills_gaps_and_flags_win() {
        let env = |key: &str| match key {
            "WORDWISE_DATA_DIR" => Some("/env/dir".to_string()),
            "WORDWISE_PORT" => Some("4000".to_string()),
            "WORDWISE_CATALOG" => Some("/env/words.csv".to_string()),
            _ => None,
        };
        let (config, rest) = Config::resolve(&args(&["--data-dir=/flag", "list"]), env).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/flag"));
        assert_eq!(config.port, 4000);
        assert_eq!(config.catalog, Some(PathBuf::from("/env/words.csv")));
        assert_eq!(rest, args(&["list"]));
    }

    #[test]
    fn bad_values() {
        assert_eq!(
            Config::resolve(&args(&["-p", "lots"]), no_env).unwrap_err(),
            ConfigError::InvalidPort("lots".into())
        );
        assert_eq!(
            Config::resolve(&args(&["list", "--catalog"]), no_env).unwrap_err(),
            ConfigError::MissingValue("--catalog".into())
        );
    }
}
