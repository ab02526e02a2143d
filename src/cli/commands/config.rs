use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{success, warning};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Config {
        print_config,
        check,
    } = cmd
    {
        if *print_config {
            let yaml = serde_yaml::to_string(cfg).map_err(|e| AppError::Config(e.to_string()))?;
            println!("# {}", Config::config_file().display());
            print!("{}", yaml);
        }

        if *check {
            if !Config::config_file().exists() {
                warning(format!(
                    "No configuration file at {}; defaults are in use. Run `kintouch init`.",
                    Config::config_file().display()
                ));
                return Ok(());
            }

            let missing = Config::missing_keys()?;
            if missing.is_empty() {
                success("Configuration file is complete.");
            } else {
                warning(format!(
                    "Missing keys (defaults apply): {}",
                    missing.join(", ")
                ));
            }
            // surface invalid values early
            cfg.offset()?;
        }
    }

    Ok(())
}
