//! Daemon orchestration -- assembly, startup order and fatal-exit supervision.
//!
//! The [`Orchestrator`] owns the alarm monitor, the alarm transport handle
//! and the HTTP shell task.
//!
//! # Startup Order
//!
//! 1. Metrics recorder (when enabled)
//! 2. Docker client (ping logged, not fatal)
//! 3. Alarm transport `open` (authentication or connection failure is fatal)
//! 4. HTTP shell
//! 5. Alarm monitor task
//!
//! # Exit
//!
//! - Shutdown signal: stop the monitor, close the transport, return `Ok`
//! - Monitor task ends with a fatal error: log it, return `Err` so the
//!   process exits non-zero

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

use dockermon_alarm_monitor::{
    AlarmMonitor, AlarmMonitorBuilder, AlarmMonitorConfig, AlarmTransport, AmqpAlarmTransport,
    AmqpSettings, BollardDockerClient, DockerClient,
};
use dockermon_core::config::DockermonConfig;
use dockermon_core::pipeline::Pipeline;

use crate::{http, metrics_server};

/// Production orchestrator type.
pub type DaemonOrchestrator = Orchestrator<BollardDockerClient, AmqpAlarmTransport>;

/// The main daemon orchestrator.
pub struct Orchestrator<D: DockerClient, T: AlarmTransport> {
    /// Loaded and validated configuration.
    config: DockermonConfig,
    monitor: AlarmMonitor<D, Arc<T>>,
    /// Shared with the monitor task; closed on graceful shutdown.
    transport: Arc<T>,
    http_task: Option<JoinHandle<()>>,
}

impl DaemonOrchestrator {
    /// Connect to Docker and the alarm bus and assemble the daemon.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The metrics recorder cannot be installed
    /// - The Docker client cannot be created
    /// - The alarm bus rejects the credentials or cannot be reached
    pub async fn build_from_config(config: DockermonConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let monitor_config = AlarmMonitorConfig::from_core(&config.docker);
        let docker = BollardDockerClient::from_config(&monitor_config)
            .map_err(|e| anyhow::anyhow!("failed to create docker client: {}", e))?;
        match docker.ping().await {
            Ok(()) => {
                tracing::info!(socket = %monitor_config.docker_socket, "docker daemon reachable")
            }
            Err(e) => tracing::warn!(
                socket = %monitor_config.docker_socket,
                error = %e,
                "docker daemon not reachable, continuing"
            ),
        }

        let settings = AmqpSettings::from_core(&config.alarm_bus);
        let transport = AmqpAlarmTransport::open(&settings).await.map_err(|e| {
            tracing::error!(error = %e, "alarm bus unavailable, refusing to start");
            anyhow::anyhow!("failed to open alarm transport: {}", e)
        })?;

        Self::new(config, Arc::new(docker), transport)
    }
}

impl<D: DockerClient, T: AlarmTransport> Orchestrator<D, T> {
    /// Assemble the daemon around an already connected Docker client and transport.
    pub fn new(config: DockermonConfig, docker: Arc<D>, transport: T) -> Result<Self> {
        let transport = Arc::new(transport);
        let monitor = AlarmMonitorBuilder::new()
            .config(AlarmMonitorConfig::from_core(&config.docker))
            .docker_client(docker)
            .transport(Arc::clone(&transport))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build alarm monitor: {}", e))?;

        tracing::info!(
            alignment_window_secs = config.docker.alignment_window_secs,
            http_enabled = config.http.enabled,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            monitor,
            transport,
            http_task: None,
        })
    }

    /// Start the HTTP shell and the monitor, then block until a shutdown
    /// signal (SIGTERM, SIGINT) or a fatal monitor error.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(wait_for_shutdown_signal()).await
    }

    /// Like [`run`](Self::run) with a caller-provided shutdown trigger.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<&'static str>>,
    {
        if self.config.http.enabled {
            let (_, task) = http::start(&self.config.http).await?;
            self.http_task = Some(task);
        }

        if let Err(e) = self.monitor.start().await {
            self.stop_http();
            return Err(anyhow::anyhow!("failed to start alarm monitor: {}", e));
        }

        tracing::info!("dockermon running");

        tokio::select! {
            signal = shutdown => {
                let signal = signal?;
                tracing::info!(signal, "shutdown signal received");
                self.shutdown().await;
                Ok(())
            }
            outcome = self.monitor.wait() => {
                self.stop_http();
                self.transport.close().await;
                match outcome {
                    Ok(()) => Err(anyhow::anyhow!("alarm monitor exited unexpectedly")),
                    Err(e) => {
                        tracing::error!(error = %e, fatal = e.is_fatal(), "alarm monitor stopped on fatal error");
                        Err(anyhow::anyhow!("alarm monitor stopped on fatal error: {}", e))
                    }
                }
            }
        }
    }

    /// Stop the monitor, close the transport and the HTTP shell.
    async fn shutdown(&mut self) {
        if self.monitor.is_running() {
            if let Err(e) = self.monitor.stop().await {
                tracing::error!(error = %e, "failed to stop alarm monitor");
            }
        }
        self.transport.close().await;
        self.stop_http();
        tracing::info!("dockermon shut down");
    }

    fn stop_http(&mut self) {
        if let Some(task) = self.http_task.take() {
            task.abort();
        }
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &DockermonConfig {
        &self.config
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
