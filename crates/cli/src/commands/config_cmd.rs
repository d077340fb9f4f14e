//! `digm config` — Print the effective configuration.

use digm_config::AppConfig;

/// Print the configuration after file and environment overrides, with
/// every secret masked.
pub fn show(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("# {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", config.redacted_toml());
    Ok(())
}
