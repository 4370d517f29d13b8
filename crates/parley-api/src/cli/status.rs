//! System status command.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Print configuration and storage counters.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let stats = state.threads.stats().await?;
    let config = &state.config;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "backend": state.sessions.backend_name(),
            "summary_engine": config.summary.engine,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Parley v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Storage ──").dim());
    println!("  Users:        {}", style(stats.users).bold());
    println!("  Threads:      {}", style(stats.threads).bold());
    println!("  Messages:     {}", style(stats.messages).bold());
    println!("  Translations: {}", style(stats.translations).bold());
    println!();

    println!("  {}", style("── Config ──").dim());
    println!("  Data dir:     {}", style(state.data_dir.display()).cyan());
    println!("  Backend:      {}", style(state.sessions.backend_name()).cyan());
    println!("  Summary:      {:?}", config.summary.engine);
    println!(
        "  Listen:       {}",
        style(format!("{}:{}", config.server.host, config.server.port)).cyan()
    );
    println!();

    Ok(())
}
