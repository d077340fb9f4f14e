//! `digm ask` — Run one coaching query through the full pipeline.
//!
//! Uses the same collaborators as `serve`, so it doubles as a smoke test
//! of a deployment's credentials.

use digm_config::AppConfig;

pub async fn run(
    config: AppConfig,
    token: &str,
    message: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let issues = config.readiness_issues();
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("  ❌ {issue}");
        }
        return Err("Configuration is not ready. Run `digm doctor` for details.".into());
    }

    let pipeline = digm_gateway::build_pipeline(&config).await?;
    let user = pipeline.resolver().resolve(Some(token), "cli:ask").await?;
    let answer = pipeline.answer(&user, message, &[]).await;

    println!("{}", serde_json::to_string_pretty(&answer)?);
    Ok(())
}
