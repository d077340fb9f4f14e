//! `digm doctor` — Diagnose configuration and collaborator health.

use std::time::Duration;

use digm_config::AppConfig;

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Digm Doctor — System Diagnostics");
    println!("===================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file valid ({})", config_path.display());
    } else {
        println!("  ⚠️  No config file at {}, using defaults + environment", config_path.display());
    }

    let readiness = config.readiness_issues();
    if readiness.is_empty() {
        println!("  ✅ Collaborator settings present");
    }
    for issue in &readiness {
        println!("  ❌ {issue}");
        issues += 1;
    }

    match digm_security::build_from_config(&config) {
        Ok(auth) => println!("  ✅ Auth: {}", auth.name()),
        Err(e) => {
            println!("  ❌ Auth: {e}");
            issues += 1;
        }
    }

    match digm_store::build_from_config(&config).await {
        Ok(store) => println!("  ✅ Store: {}", store.name()),
        Err(e) => {
            println!("  ❌ Store: {e}");
            issues += 1;
        }
    }

    // Only probe the model endpoint when there is something to probe with.
    if config.api_key.is_some() || config.provider.name == "ollama" {
        let provider = digm_providers::build_from_config(&config);
        let timeout = Duration::from_secs(config.provider.timeout_secs);
        match tokio::time::timeout(timeout, provider.health_check()).await {
            Ok(Ok(true)) => println!("  ✅ Provider {} reachable", provider.name()),
            Ok(Ok(false)) => {
                println!("  ❌ Provider {} answered but is not healthy", provider.name());
                issues += 1;
            }
            Ok(Err(e)) => {
                println!("  ❌ Provider {}: {e}", provider.name());
                issues += 1;
            }
            Err(_) => {
                println!("  ❌ Provider {} timed out after {}s", provider.name(), timeout.as_secs());
                issues += 1;
            }
        }
    }

    println!();
    println!("   Model:      {}", config.provider.model);
    println!("   Selection:  {} (limit {})", config.selection.strategy, config.selection.limit);
    println!("   Embeddings: {}", if config.embeddings.enabled { "enabled" } else { "disabled" });
    println!("   Gateway:    {}:{}", config.gateway.host, config.gateway.port);

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
