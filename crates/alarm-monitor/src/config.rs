//! 알람 모니터 설정
//!
//! [`AlarmMonitorConfig`]는 core의 [`DockerConfig`](dockermon_core::config::DockerConfig)를
//! 기반으로 이벤트 엔진 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use dockermon_core::config::DockermonConfig;
//! use dockermon_alarm_monitor::config::AlarmMonitorConfig;
//!
//! let core_config = DockermonConfig::default();
//! let config = AlarmMonitorConfig::from_core(&core_config.docker);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use dockermon_core::config::MAX_ALIGNMENT_WINDOW_SECS;

use crate::error::AlarmMonitorError;

/// 알람 모니터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmMonitorConfig {
    /// Docker 소켓 경로
    pub docker_socket: String,
    /// Docker API 요청 타임아웃 (초)
    pub docker_timeout_secs: u64,
    /// 시작 시 정렬할 과거 이벤트 윈도우 (초, 0이면 정렬 생략)
    pub alignment_window_secs: u64,
    /// 구독이 끊긴 뒤 재구독까지 대기 시간 (밀리초)
    pub resubscribe_delay_ms: u64,
    /// 이미지 ID 조회 타임아웃 (밀리초)
    pub image_lookup_timeout_ms: u64,
}

impl Default for AlarmMonitorConfig {
    fn default() -> Self {
        Self {
            docker_socket: "/var/run/docker.sock".to_owned(),
            docker_timeout_secs: 120,
            alignment_window_secs: 3600,
            resubscribe_delay_ms: 1000,
            image_lookup_timeout_ms: 2000,
        }
    }
}

/// 설정 상한값 상수
const MAX_DOCKER_TIMEOUT_SECS: u64 = 3600;
const MAX_RESUBSCRIBE_DELAY_MS: u64 = 60_000;
const MAX_IMAGE_LOOKUP_TIMEOUT_MS: u64 = 60_000;

impl AlarmMonitorConfig {
    /// core의 `DockerConfig`에서 모니터 설정을 생성합니다.
    pub fn from_core(core: &dockermon_core::config::DockerConfig) -> Self {
        Self {
            docker_socket: core.socket.clone(),
            docker_timeout_secs: core.timeout_secs,
            alignment_window_secs: core.alignment_window_secs,
            resubscribe_delay_ms: core.resubscribe_delay_ms,
            image_lookup_timeout_ms: core.image_lookup_timeout_ms,
        }
    }

    /// 재구독 대기 시간
    pub fn resubscribe_delay(&self) -> Duration {
        Duration::from_millis(self.resubscribe_delay_ms)
    }

    /// 이미지 조회 타임아웃
    pub fn image_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.image_lookup_timeout_ms)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), AlarmMonitorError> {
        if self.docker_socket.is_empty() {
            return Err(AlarmMonitorError::Config {
                field: "docker_socket".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.docker_timeout_secs == 0 || self.docker_timeout_secs > MAX_DOCKER_TIMEOUT_SECS {
            return Err(AlarmMonitorError::Config {
                field: "docker_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_DOCKER_TIMEOUT_SECS}"),
            });
        }

        if self.alignment_window_secs > MAX_ALIGNMENT_WINDOW_SECS {
            return Err(AlarmMonitorError::Config {
                field: "alignment_window_secs".to_owned(),
                reason: format!("must be 0-{MAX_ALIGNMENT_WINDOW_SECS}"),
            });
        }

        if self.resubscribe_delay_ms > MAX_RESUBSCRIBE_DELAY_MS {
            return Err(AlarmMonitorError::Config {
                field: "resubscribe_delay_ms".to_owned(),
                reason: format!("must be 0-{MAX_RESUBSCRIBE_DELAY_MS}"),
            });
        }

        if self.image_lookup_timeout_ms == 0
            || self.image_lookup_timeout_ms > MAX_IMAGE_LOOKUP_TIMEOUT_MS
        {
            return Err(AlarmMonitorError::Config {
                field: "image_lookup_timeout_ms".to_owned(),
                reason: format!("must be 1-{MAX_IMAGE_LOOKUP_TIMEOUT_MS}"),
            });
        }

        Ok(())
    }
}

/// 알람 모니터 설정 빌더
#[derive(Default)]
pub struct AlarmMonitorConfigBuilder {
    config: AlarmMonitorConfig,
}

impl AlarmMonitorConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// Docker 소켓 경로를 설정합니다.
    pub fn docker_socket(mut self, socket: impl Into<String>) -> Self {
        self.config.docker_socket = socket.into();
        self
    }

    /// Docker API 타임아웃(초)을 설정합니다.
    pub fn docker_timeout_secs(mut self, secs: u64) -> Self {
        self.config.docker_timeout_secs = secs;
        self
    }

    /// 정렬 윈도우(초)를 설정합니다.
    pub fn alignment_window_secs(mut self, secs: u64) -> Self {
        self.config.alignment_window_secs = secs;
        self
    }

    /// 재구독 대기 시간(밀리초)을 설정합니다.
    pub fn resubscribe_delay_ms(mut self, ms: u64) -> Self {
        self.config.resubscribe_delay_ms = ms;
        self
    }

    /// 이미지 조회 타임아웃(밀리초)을 설정합니다.
    pub fn image_lookup_timeout_ms(mut self, ms: u64) -> Self {
        self.config.image_lookup_timeout_ms = ms;
        self
    }

    /// 설정을 검증하고 `AlarmMonitorConfig`를 생성합니다.
    pub fn build(self) -> Result<AlarmMonitorConfig, AlarmMonitorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
