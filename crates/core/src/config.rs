//! 설정 관리 -- dockermon.toml 파싱 및 런타임 설정
//!
//! [`DockermonConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`RABBITMQ_HOST`, `DOCKERMON_DOCKER_SOCKET=...` 형식)
//! 3. 설정 파일 (`dockermon.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), dockermon_core::error::DockermonError> {
//! use dockermon_core::config::DockermonConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DockermonConfig::load("dockermon.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DockermonConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DockermonError};

/// 정렬(alignment) 윈도우 상한 (7일)
pub const MAX_ALIGNMENT_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

/// dockermon 통합 설정
///
/// `dockermon.toml` 파일의 최상위 구조를 나타냅니다.
/// 모든 섹션은 생략 가능하며, 생략 시 기본값이 적용됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockermonConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Docker 이벤트 소스 설정
    #[serde(default)]
    pub docker: DockerConfig,
    /// 알람 버스 (RabbitMQ) 설정
    #[serde(default)]
    pub alarm_bus: AlarmBusConfig,
    /// HTTP 셸 설정
    #[serde(default)]
    pub http: HttpConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl DockermonConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 파일이 없으면 `ConfigError::FileNotFound`를 반환합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DockermonError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일이 있으면 로드하고, 없으면 기본값에서 시작합니다.
    ///
    /// 어느 경우든 환경변수 오버라이드와 검증을 거칩니다.
    /// 환경변수만으로 설정하는 컨테이너 배포를 위한 경로입니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, DockermonError> {
        let mut config = match Self::from_file(path.as_ref()).await {
            Ok(config) => config,
            Err(DockermonError::Config(ConfigError::FileNotFound { path })) => {
                tracing::info!(path = %path, "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DockermonError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DockermonError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DockermonError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DockermonError> {
        toml::from_str(toml_str).map_err(|e| {
            DockermonError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 알람 버스 접속 정보는 배포 환경에서 쓰던 `RABBITMQ_*` 이름을 그대로 사용하고,
    /// 나머지는 `DOCKERMON_{SECTION}_{FIELD}` 규칙을 따릅니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DOCKERMON_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DOCKERMON_GENERAL_LOG_FORMAT");

        // Docker
        override_string(&mut self.docker.socket, "DOCKERMON_DOCKER_SOCKET");
        override_u64(&mut self.docker.timeout_secs, "DOCKERMON_DOCKER_TIMEOUT_SECS");
        override_u64(
            &mut self.docker.alignment_window_secs,
            "DOCKERMON_DOCKER_ALIGNMENT_WINDOW_SECS",
        );
        override_u64(
            &mut self.docker.resubscribe_delay_ms,
            "DOCKERMON_DOCKER_RESUBSCRIBE_DELAY_MS",
        );
        override_u64(
            &mut self.docker.image_lookup_timeout_ms,
            "DOCKERMON_DOCKER_IMAGE_LOOKUP_TIMEOUT_MS",
        );

        // Alarm bus
        override_string(&mut self.alarm_bus.host, "RABBITMQ_HOST");
        override_u16(&mut self.alarm_bus.port, "RABBITMQ_PORT");
        override_string(&mut self.alarm_bus.user, "RABBITMQ_USER");
        override_string(&mut self.alarm_bus.password, "RABBITMQ_PASSWORD");
        override_string(&mut self.alarm_bus.vhost, "DOCKERMON_ALARM_BUS_VHOST");
        override_string(&mut self.alarm_bus.exchange, "DOCKERMON_ALARM_BUS_EXCHANGE");
        override_string(
            &mut self.alarm_bus.routing_key,
            "DOCKERMON_ALARM_BUS_ROUTING_KEY",
        );

        // HTTP
        override_bool(&mut self.http.enabled, "DOCKERMON_HTTP_ENABLED");
        override_string(&mut self.http.bind, "DOCKERMON_HTTP_BIND");

        // Metrics
        override_bool(&mut self.metrics.enabled, "DOCKERMON_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "DOCKERMON_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "DOCKERMON_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DockermonError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.docker.socket.is_empty() {
            return Err(invalid("docker.socket", "must not be empty"));
        }

        if self.docker.timeout_secs == 0 {
            return Err(invalid("docker.timeout_secs", "must be greater than 0"));
        }

        if self.docker.alignment_window_secs > MAX_ALIGNMENT_WINDOW_SECS {
            return Err(invalid(
                "docker.alignment_window_secs",
                format!("must be 0-{MAX_ALIGNMENT_WINDOW_SECS}"),
            ));
        }

        if self.docker.image_lookup_timeout_ms == 0 {
            return Err(invalid(
                "docker.image_lookup_timeout_ms",
                "must be greater than 0",
            ));
        }

        if self.alarm_bus.host.is_empty() {
            return Err(invalid("alarm_bus.host", "must not be empty"));
        }

        if self.alarm_bus.port == 0 {
            return Err(invalid("alarm_bus.port", "must be 1-65535"));
        }

        if self.alarm_bus.exchange.is_empty() && self.alarm_bus.routing_key.is_empty() {
            return Err(invalid(
                "alarm_bus.routing_key",
                "must not be empty when publishing to the default exchange",
            ));
        }

        if self.http.enabled && self.http.bind.parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "http.bind",
                format!("'{}' is not a valid socket address", self.http.bind),
            ));
        }

        if self.metrics.enabled {
            if self.metrics.listen_addr.parse::<IpAddr>().is_err() {
                return Err(invalid(
                    "metrics.listen_addr",
                    format!("'{}' is not a valid IP address", self.metrics.listen_addr),
                ));
            }
            if self.metrics.port == 0 {
                return Err(invalid("metrics.port", "must be 1-65535"));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> DockermonError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Docker 이벤트 소스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker 소켓 경로
    pub socket: String,
    /// Docker API 요청 타임아웃 (초)
    ///
    /// 이벤트 스트림도 이 시간이 지나면 끊기고, 워터마크에서 다시 구독합니다.
    pub timeout_secs: u64,
    /// 시작 시 정렬할 과거 이벤트 윈도우 (초, 0이면 정렬 생략)
    pub alignment_window_secs: u64,
    /// 구독이 끊긴 뒤 재구독까지 대기 시간 (밀리초)
    pub resubscribe_delay_ms: u64,
    /// 이미지 ID 조회 타임아웃 (밀리초)
    pub image_lookup_timeout_ms: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: "/var/run/docker.sock".to_owned(),
            timeout_secs: 120,
            alignment_window_secs: 3600,
            resubscribe_delay_ms: 1000,
            image_lookup_timeout_ms: 2000,
        }
    }
}

/// 알람 버스 (RabbitMQ) 설정
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmBusConfig {
    /// 브로커 호스트
    pub host: String,
    /// 브로커 포트
    pub port: u16,
    /// 사용자명
    pub user: String,
    /// 비밀번호
    pub password: String,
    /// 가상 호스트
    pub vhost: String,
    /// 발행 대상 exchange (빈 문자열이면 기본 exchange)
    pub exchange: String,
    /// 라우팅 키
    pub routing_key: String,
}

impl Default for AlarmBusConfig {
    fn default() -> Self {
        Self {
            host: "rabbitmq".to_owned(),
            port: 5672,
            user: "guest".to_owned(),
            password: "guest".to_owned(),
            vhost: "/".to_owned(),
            exchange: String::new(),
            routing_key: "alarms".to_owned(),
        }
    }
}

// password가 로그에 남지 않도록 Debug를 직접 구현
impl std::fmt::Debug for AlarmBusConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmBusConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("vhost", &self.vhost)
            .field("exchange", &self.exchange)
            .field("routing_key", &self.routing_key)
            .finish()
    }
}

/// HTTP 셸 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소 (`ip:port`)
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0:5000".to_owned(),
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스닝 주소
    pub listen_addr: String,
    /// 리스닝 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
