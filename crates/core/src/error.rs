//! 에러 타입 -- 도메인별 에러 정의

/// dockermon 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DockermonError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 생명주기 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 알람 처리 에러
    #[error("alarm error: {0}")]
    Alarm(#[from] AlarmError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DockermonError {
    /// 프로세스를 종료시켜야 하는 에러인지 확인합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Alarm(
                AlarmError::Authentication(_)
                    | AlarmError::Connection(_)
                    | AlarmError::ConnectionClosed(_)
            )
        )
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline is not running")]
    NotRunning,

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 백그라운드 태스크 비정상 종료
    #[error("pipeline task failed: {0}")]
    TaskFailed(String),
}

/// 알람 처리 에러
///
/// 이벤트 소스, 알람 버스 전송 단계의 실패를 분류합니다.
#[derive(Debug, thiserror::Error)]
pub enum AlarmError {
    /// 이벤트 스트림을 가져올 수 없음
    #[error("event source unavailable: {0}")]
    EventSource(String),

    /// 알람 버스 인증 실패
    #[error("alarm bus authentication failed: {0}")]
    Authentication(String),

    /// 알람 버스 연결 실패
    #[error("alarm bus connection failed: {0}")]
    Connection(String),

    /// 알람 버스 연결이 끊어짐
    #[error("alarm bus connection closed: {0}")]
    ConnectionClosed(String),

    /// 전송 측 검증에 실패한 알람
    #[error("invalid alarm: {0}")]
    InvalidAlarm(String),
}
