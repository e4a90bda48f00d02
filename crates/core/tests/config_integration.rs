//! dockermon.toml 통합 설정 테스트
//!
//! - dockermon.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 파일 로딩 / 잘못된 형식 에러 테스트

use std::io::Write;

use dockermon_core::config::DockermonConfig;
use dockermon_core::error::{ConfigError, DockermonError};

const EXAMPLE: &str = include_str!("../../../dockermon.toml.example");

// =============================================================================
// dockermon.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_and_validates() {
    let config = DockermonConfig::parse(EXAMPLE).expect("example config should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let example = DockermonConfig::parse(EXAMPLE).expect("should parse");
    let defaults = DockermonConfig::default();

    assert_eq!(example.general.log_level, defaults.general.log_level);
    assert_eq!(example.general.log_format, defaults.general.log_format);
    assert_eq!(example.docker.socket, defaults.docker.socket);
    assert_eq!(example.docker.timeout_secs, defaults.docker.timeout_secs);
    assert_eq!(
        example.docker.alignment_window_secs,
        defaults.docker.alignment_window_secs
    );
    assert_eq!(
        example.docker.resubscribe_delay_ms,
        defaults.docker.resubscribe_delay_ms
    );
    assert_eq!(
        example.docker.image_lookup_timeout_ms,
        defaults.docker.image_lookup_timeout_ms
    );
    assert_eq!(example.alarm_bus.host, defaults.alarm_bus.host);
    assert_eq!(example.alarm_bus.port, defaults.alarm_bus.port);
    assert_eq!(example.alarm_bus.user, defaults.alarm_bus.user);
    assert_eq!(example.alarm_bus.vhost, defaults.alarm_bus.vhost);
    assert_eq!(example.alarm_bus.exchange, defaults.alarm_bus.exchange);
    assert_eq!(example.alarm_bus.routing_key, defaults.alarm_bus.routing_key);
    assert_eq!(example.http.enabled, defaults.http.enabled);
    assert_eq!(example.http.bind, defaults.http.bind);
    assert_eq!(example.metrics.enabled, defaults.metrics.enabled);
    assert_eq!(example.metrics.port, defaults.metrics.port);
    assert_eq!(example.metrics.endpoint, defaults.metrics.endpoint);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_docker_only() {
    let toml = r#"
[docker]
socket = "/run/user/1000/docker.sock"
alignment_window_secs = 0
"#;
    let config = DockermonConfig::parse(toml).expect("should parse");
    assert_eq!(config.docker.socket, "/run/user/1000/docker.sock");
    assert_eq!(config.docker.alignment_window_secs, 0);
    // 나머지는 기본값
    assert_eq!(config.docker.timeout_secs, 120);
    assert_eq!(config.alarm_bus.host, "rabbitmq");
    config.validate().expect("should validate");
}

#[test]
fn partial_config_alarm_bus_with_exchange() {
    let toml = r#"
[alarm_bus]
exchange = "dojot.alarms"
routing_key = ""
"#;
    let config = DockermonConfig::parse(toml).expect("should parse");
    assert_eq!(config.alarm_bus.exchange, "dojot.alarms");
    // 이름 있는 exchange는 빈 라우팅 키를 허용
    config.validate().expect("should validate");
}

#[test]
fn wrong_type_is_a_parse_error() {
    let toml = r#"
[alarm_bus]
port = "five thousand"
"#;
    let err = DockermonConfig::parse(toml).unwrap_err();
    assert!(matches!(
        err,
        DockermonError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_reads_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "[general]\nlog_level = \"debug\"").expect("write");

    let config = DockermonConfig::load(file.path()).await.expect("should load");
    assert_eq!(config.general.log_level, "debug");
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_explicit_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.toml");

    let err = DockermonConfig::load(&missing).await.unwrap_err();
    assert!(matches!(
        err,
        DockermonError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_invalid_values_in_file() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "[docker]\nalignment_window_secs = 9999999").expect("write");

    let err = DockermonConfig::load(file.path()).await.unwrap_err();
    assert!(err.to_string().contains("alignment_window_secs"));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let original = std::env::var("RABBITMQ_HOST").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("RABBITMQ_HOST", "mq.prod");
    }

    let mut config =
        DockermonConfig::parse("[alarm_bus]\nhost = \"from-file\"").expect("should parse");
    config.apply_env_overrides();
    let result = config.alarm_bus.host.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("RABBITMQ_HOST", val),
            None => std::env::remove_var("RABBITMQ_HOST"),
        }
    }

    assert_eq!(result, "mq.prod");
}

#[test]
#[serial_test::serial]
fn env_override_numeric_docker_field() {
    let original = std::env::var("DOCKERMON_DOCKER_RESUBSCRIBE_DELAY_MS").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("DOCKERMON_DOCKER_RESUBSCRIBE_DELAY_MS", "250");
    }

    let mut config = DockermonConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.docker.resubscribe_delay_ms;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("DOCKERMON_DOCKER_RESUBSCRIBE_DELAY_MS", val),
            None => std::env::remove_var("DOCKERMON_DOCKER_RESUBSCRIBE_DELAY_MS"),
        }
    }

    assert_eq!(result, 250);
}

#[test]
#[serial_test::serial]
fn env_override_bool_http_field() {
    let original = std::env::var("DOCKERMON_HTTP_ENABLED").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("DOCKERMON_HTTP_ENABLED", "false");
    }

    let mut config = DockermonConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.http.enabled;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("DOCKERMON_HTTP_ENABLED", val),
            None => std::env::remove_var("DOCKERMON_HTTP_ENABLED"),
        }
    }

    assert!(!result);
}

#[tokio::test]
#[serial_test::serial]
async fn load_or_default_applies_env_without_file() {
    let original = std::env::var("RABBITMQ_PORT").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("RABBITMQ_PORT", "15672");
    }

    let result = DockermonConfig::load_or_default("/nonexistent/dockermon.toml").await;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("RABBITMQ_PORT", val),
            None => std::env::remove_var("RABBITMQ_PORT"),
        }
    }

    let config = result.expect("defaults should load");
    assert_eq!(config.alarm_bus.port, 15672);
}
