//! 알람 모니터 에러 타입
//!
//! [`AlarmMonitorError`]는 이벤트 소스, 이미지 조회, 알람 전송 단계의 모든 실패를 표현합니다.
//! `From<AlarmMonitorError> for DockermonError` 변환이 구현되어 있어
//! 데몬에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use dockermon_core::error::{AlarmError, ConfigError, DockermonError};

/// 알람 모니터 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum AlarmMonitorError {
    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// 이벤트 스트림 조회/구독 실패
    #[error("event source error: {0}")]
    EventSource(String),

    /// 이미지를 찾을 수 없음
    #[error("image not found: {0}")]
    ImageNotFound(String),

    /// 이미지 조회 실패 (타임아웃, API 에러)
    #[error("image lookup failed: {0}")]
    ImageLookup(String),

    /// 알람 버스 인증 실패
    #[error("alarm bus authentication failed: {0}")]
    Authentication(String),

    /// 알람 버스 연결 실패
    #[error("alarm bus connection failed: {0}")]
    TransportConnection(String),

    /// 전송 측에서 거부된 알람
    #[error("invalid alarm: {0}")]
    InvalidAlarm(String),

    /// 운영 중 알람 버스 연결이 끊어짐
    #[error("alarm bus connection closed: {0}")]
    ConnectionClosed(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl AlarmMonitorError {
    /// 모니터를 멈추고 프로세스를 종료시켜야 하는 에러인지 확인합니다.
    ///
    /// 알람 버스 인증/연결 실패와 연결 끊김만 치명적입니다.
    /// 이벤트 소스 에러는 재구독으로, 잘못된 알람은 폐기로 처리됩니다.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_) | Self::TransportConnection(_) | Self::ConnectionClosed(_)
        )
    }
}

impl From<AlarmMonitorError> for DockermonError {
    fn from(err: AlarmMonitorError) -> Self {
        match err {
            AlarmMonitorError::DockerConnection(_)
            | AlarmMonitorError::EventSource(_)
            | AlarmMonitorError::ImageNotFound(_)
            | AlarmMonitorError::ImageLookup(_) => {
                DockermonError::Alarm(AlarmError::EventSource(err.to_string()))
            }
            AlarmMonitorError::Authentication(msg) => {
                DockermonError::Alarm(AlarmError::Authentication(msg))
            }
            AlarmMonitorError::TransportConnection(msg) => {
                DockermonError::Alarm(AlarmError::Connection(msg))
            }
            AlarmMonitorError::InvalidAlarm(msg) => {
                DockermonError::Alarm(AlarmError::InvalidAlarm(msg))
            }
            AlarmMonitorError::ConnectionClosed(msg) => {
                DockermonError::Alarm(AlarmError::ConnectionClosed(msg))
            }
            AlarmMonitorError::Config { field, reason } => {
                DockermonError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
