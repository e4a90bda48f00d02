use anyhow::Result;
use clap::Parser;

use dockermon_core::config::DockermonConfig;
use dockermon_daemon::cli::DaemonCli;
use dockermon_daemon::logging;
use dockermon_daemon::orchestrator::DaemonOrchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드: 파일 → 환경 변수 → CLI
    let (path, explicit) = cli.config_path();
    let mut config = if explicit {
        DockermonConfig::load(&path).await
    } else {
        DockermonConfig::load_or_default(&path).await
    }
    .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path.display(), e))?;

    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", path.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        "dockermon starting"
    );

    let mut orchestrator = DaemonOrchestrator::build_from_config(config).await?;
    orchestrator.run().await
}
