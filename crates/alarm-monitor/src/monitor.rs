//! 알람 모니터 오케스트레이터 -- 정렬 후 라이브 디스패치를 하나의 태스크로 실행
//!
//! [`AlarmMonitor`]는 core의 [`Pipeline`] trait을 구현하여
//! `dockermon-daemon`에서 시작/정지됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! start()
//!   └─ spawn ──> AlignmentEngine.align([start - window, start - 1])
//!                    |
//!                LiveDispatcher.run(watermark = start)
//!                    |
//!                치명적 전송 에러 ──> wait()가 Err 반환 ──> 데몬 종료
//! ```
//!
//! 워터마크와 정렬 누적기는 이 태스크 하나가 소유하며 잠금 없이 사용됩니다.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use dockermon_core::error::{DockermonError, PipelineError};
use dockermon_core::pipeline::Pipeline;

use crate::alignment::AlignmentEngine;
use crate::classifier::Classifier;
use crate::config::AlarmMonitorConfig;
use crate::dispatch::LiveDispatcher;
use crate::docker::DockerClient;
use crate::error::AlarmMonitorError;
use crate::event::EventWindow;
use crate::resolver::ImageResolver;
use crate::transport::AlarmTransport;
use crate::watermark::Watermark;

/// 모니터 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum MonitorState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 알람 모니터
///
/// # 사용 예시
/// ```ignore
/// use dockermon_alarm_monitor::{AlarmMonitorBuilder, AmqpAlarmTransport, BollardDockerClient};
///
/// let transport = AmqpAlarmTransport::open(&settings).await?;
/// let mut monitor = AlarmMonitorBuilder::new()
///     .config(config)
///     .docker_client(Arc::new(docker))
///     .transport(transport)
///     .build()?;
///
/// monitor.start().await?;
/// monitor.wait().await?; // 치명적 에러로 멈출 때까지 대기
/// ```
pub struct AlarmMonitor<D: DockerClient, T: AlarmTransport> {
    config: AlarmMonitorConfig,
    state: MonitorState,
    docker: Arc<D>,
    /// 알람 전송 (start 시 태스크로 이동)
    transport: Option<T>,
    /// 시작 시각 고정값 (미설정 시 start 시점의 현재 시각)
    start_time: Option<i64>,
    task: Option<JoinHandle<Result<(), AlarmMonitorError>>>,
}

impl<D: DockerClient, T: AlarmTransport> AlarmMonitor<D, T> {
    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            MonitorState::Initialized => "initialized",
            MonitorState::Running => "running",
            MonitorState::Stopped => "stopped",
        }
    }

    /// 모니터 태스크가 끝날 때까지 기다립니다.
    ///
    /// 태스크는 치명적 에러가 있을 때만 끝나므로, 반환값은 보통 그 에러입니다.
    /// 이 future를 취소해도 태스크는 계속 실행되며 이후 `stop()`으로 정지할 수 있습니다.
    pub async fn wait(&mut self) -> Result<(), DockermonError> {
        let Some(task) = self.task.as_mut() else {
            return Err(PipelineError::NotRunning.into());
        };

        let outcome = task.await;
        self.task = None;
        self.state = MonitorState::Stopped;

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(PipelineError::TaskFailed(e.to_string()).into()),
        }
    }
}

/// 모니터 태스크 본체: 정렬 후 라이브 디스패치
async fn run_monitor<D: DockerClient, T: AlarmTransport>(
    docker: Arc<D>,
    transport: T,
    config: AlarmMonitorConfig,
    started_at: i64,
) -> Result<(), AlarmMonitorError> {
    let classifier = Classifier::new(ImageResolver::new(
        Arc::clone(&docker),
        config.image_lookup_timeout(),
    ));
    let mut watermark = Watermark::new(started_at);

    match EventWindow::alignment(started_at, config.alignment_window_secs) {
        Some(window) => {
            let mut engine = AlignmentEngine::new();
            engine
                .align(
                    docker.as_ref(),
                    &classifier,
                    &transport,
                    window,
                    &mut watermark,
                )
                .await?;
        }
        None => info!("alignment disabled"),
    }

    let dispatcher = LiveDispatcher::new(
        docker.as_ref(),
        &classifier,
        &transport,
        config.resubscribe_delay(),
    );
    let result = dispatcher.run(&mut watermark).await;
    if let Err(e) = &result {
        error!(error = %e, %watermark, "live dispatch stopped");
    }
    result
}

impl<D: DockerClient, T: AlarmTransport> Pipeline for AlarmMonitor<D, T> {
    async fn start(&mut self) -> Result<(), DockermonError> {
        if self.state == MonitorState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!("starting alarm monitor");

        if let Err(e) = self.docker.ping().await {
            warn!(error = %e, "docker daemon not reachable yet, events will be retried");
        }

        let transport = self.transport.take().ok_or_else(|| {
            DockermonError::Pipeline(PipelineError::InitFailed(
                "alarm transport already consumed, build a new monitor to restart".to_owned(),
            ))
        })?;

        let started_at = self
            .start_time
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let docker = Arc::clone(&self.docker);
        let config = self.config.clone();

        self.task = Some(tokio::spawn(run_monitor(
            docker, transport, config, started_at,
        )));
        self.state = MonitorState::Running;
        info!(started_at, "alarm monitor started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DockermonError> {
        if self.state != MonitorState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping alarm monitor");
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }

        self.state = MonitorState::Stopped;
        info!("alarm monitor stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.state == MonitorState::Running
            && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

/// 알람 모니터 빌더
pub struct AlarmMonitorBuilder<D: DockerClient, T: AlarmTransport> {
    config: AlarmMonitorConfig,
    docker: Option<Arc<D>>,
    transport: Option<T>,
    start_time: Option<i64>,
}

impl<D: DockerClient, T: AlarmTransport> AlarmMonitorBuilder<D, T> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: AlarmMonitorConfig::default(),
            docker: None,
            transport: None,
            start_time: None,
        }
    }

    /// 모니터 설정을 지정합니다.
    pub fn config(mut self, config: AlarmMonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Docker 클라이언트를 설정합니다.
    pub fn docker_client(mut self, docker: Arc<D>) -> Self {
        self.docker = Some(docker);
        self
    }

    /// 이미 연결된 알람 전송을 설정합니다.
    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 모니터 시작 시각(Unix 초)을 고정합니다.
    ///
    /// 정렬 윈도우와 워터마크 초기값이 이 시각을 기준으로 계산됩니다.
    pub fn start_time(mut self, unix_secs: i64) -> Self {
        self.start_time = Some(unix_secs);
        self
    }

    /// 모니터를 빌드합니다.
    pub fn build(self) -> Result<AlarmMonitor<D, T>, AlarmMonitorError> {
        self.config.validate()?;

        let docker = self.docker.ok_or_else(|| AlarmMonitorError::Config {
            field: "docker_client".to_owned(),
            reason: "docker client must be provided".to_owned(),
        })?;
        let transport = self.transport.ok_or_else(|| AlarmMonitorError::Config {
            field: "transport".to_owned(),
            reason: "alarm transport must be provided".to_owned(),
        })?;

        Ok(AlarmMonitor {
            config: self.config,
            state: MonitorState::Initialized,
            docker,
            transport: Some(transport),
            start_time: self.start_time,
            task: None,
        })
    }
}

impl<D: DockerClient, T: AlarmTransport> Default for AlarmMonitorBuilder<D, T> {
    fn default() -> Self {
        Self::new()
    }
}
