//! `digm serve` — Start the HTTP API server.

use digm_config::AppConfig;

pub async fn run(
    mut config: AppConfig,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Digm AI Coach");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Auth:      {}", config.auth.mode);
    println!("   Store:     {}", config.store.backend);
    println!("   Model:     {}", config.provider.model);

    digm_gateway::start(config).await?;

    Ok(())
}
