//! 알람 전송 -- 알람 버스(RabbitMQ)로 알람 발행
//!
//! [`AlarmTransport`] trait은 전송 실패를 두 종류로 구분합니다.
//!
//! - `InvalidAlarm`: 해당 알람만 폐기하고 계속 진행
//! - `ConnectionClosed`: 복구 불가, 모니터 중단 후 프로세스 종료
//!
//! 운영 구현은 [`AmqpAlarmTransport`]이며 `lapin`으로 publisher confirm을 켠 채널에
//! JSON 알람을 발행합니다.

use std::future::Future;
use std::sync::Arc;

use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions};
use lapin::protocol::{AMQPErrorKind, AMQPSoftError};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::uri::AMQPUri;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, info, warn};

use dockermon_core::config::AlarmBusConfig;

use crate::alarm::AlarmRecord;
use crate::error::AlarmMonitorError;

/// 발행 메시지의 content type
const CONTENT_TYPE_JSON: &str = "application/json";

/// 알람 버스 전송 trait
///
/// 연결은 구현체 생성 시점(`open`)에 한 번 맺고 모니터 태스크가 소유합니다.
pub trait AlarmTransport: Send + Sync + 'static {
    /// 알람 하나를 전송하고 브로커 확인을 기다립니다.
    ///
    /// # Errors
    ///
    /// - `InvalidAlarm`: 알람 검증/직렬화 실패 또는 브로커가 거부함
    /// - `ConnectionClosed`: 채널이나 연결이 끊어짐
    fn send(
        &self,
        alarm: &AlarmRecord,
    ) -> impl Future<Output = Result<(), AlarmMonitorError>> + Send;

    /// 연결을 정상 종료합니다. 기본 구현은 아무것도 하지 않습니다.
    fn close(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

impl<T: AlarmTransport> AlarmTransport for Arc<T> {
    fn send(
        &self,
        alarm: &AlarmRecord,
    ) -> impl Future<Output = Result<(), AlarmMonitorError>> + Send {
        self.as_ref().send(alarm)
    }

    fn close(&self) -> impl Future<Output = ()> + Send {
        self.as_ref().close()
    }
}

/// AMQP 접속 설정
#[derive(Clone)]
pub struct AmqpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
    /// 빈 문자열이면 기본 exchange
    pub exchange: String,
    pub routing_key: String,
}

impl AmqpSettings {
    /// core의 `AlarmBusConfig`에서 접속 설정을 생성합니다.
    pub fn from_core(core: &AlarmBusConfig) -> Self {
        Self {
            host: core.host.clone(),
            port: core.port,
            user: core.user.clone(),
            password: core.password.clone(),
            vhost: core.vhost.clone(),
            exchange: core.exchange.clone(),
            routing_key: core.routing_key.clone(),
        }
    }

    fn uri(&self) -> AMQPUri {
        let mut uri = AMQPUri::default();
        uri.authority.host = self.host.clone();
        uri.authority.port = self.port;
        uri.authority.userinfo.username = self.user.clone();
        uri.authority.userinfo.password = self.password.clone();
        uri.vhost = self.vhost.clone();
        uri
    }
}

impl std::fmt::Debug for AmqpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpSettings")
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

/// RabbitMQ 알람 전송 구현
pub struct AmqpAlarmTransport {
    connection: Connection,
    channel: Channel,
    exchange: String,
    routing_key: String,
}

impl AmqpAlarmTransport {
    /// 브로커에 연결하고 publisher confirm 채널을 엽니다.
    ///
    /// # Errors
    ///
    /// - `Authentication`: 브로커가 자격 증명을 거부함 (`ACCESS_REFUSED`)
    /// - `TransportConnection`: 그 밖의 연결/채널 실패
    pub async fn open(settings: &AmqpSettings) -> Result<Self, AlarmMonitorError> {
        info!(
            host = %settings.host,
            port = settings.port,
            vhost = %settings.vhost,
            "connecting to alarm bus"
        );

        let connection = Connection::connect_uri(settings.uri(), ConnectionProperties::default())
            .await
            .map_err(classify_open_error)?;

        let channel = connection
            .create_channel()
            .await
            .map_err(classify_open_error)?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(classify_open_error)?;

        if !settings.exchange.is_empty() {
            channel
                .exchange_declare(
                    &settings.exchange,
                    ExchangeKind::Direct,
                    ExchangeDeclareOptions {
                        passive: true,
                        ..ExchangeDeclareOptions::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(classify_open_error)?;
        }

        info!(
            exchange = %settings.exchange,
            routing_key = %settings.routing_key,
            "alarm bus connected"
        );

        Ok(Self {
            connection,
            channel,
            exchange: settings.exchange.clone(),
            routing_key: settings.routing_key.clone(),
        })
    }
}

impl AlarmTransport for AmqpAlarmTransport {
    async fn send(&self, alarm: &AlarmRecord) -> Result<(), AlarmMonitorError> {
        let payload = alarm.to_json()?;

        let confirm = self
            .channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_content_type(CONTENT_TYPE_JSON.into()),
            )
            .await
            .map_err(classify_send_error)?
            .await
            .map_err(classify_send_error)?;

        match confirm {
            Confirmation::Ack(_) | Confirmation::NotRequested => Ok(()),
            Confirmation::Nack(_) => {
                warn!(container = %alarm.container(), "alarm bus rejected alarm");
                Err(AlarmMonitorError::InvalidAlarm(
                    "broker nacked the alarm".to_owned(),
                ))
            }
        }
    }

    async fn close(&self) {
        if let Err(e) = self.connection.close(200, "dockermon shutdown").await {
            debug!(error = %e, "alarm bus close failed");
            return;
        }
        info!("alarm bus connection closed");
    }
}

fn classify_open_error(err: lapin::Error) -> AlarmMonitorError {
    if is_authentication_failure(&err) {
        AlarmMonitorError::Authentication(err.to_string())
    } else {
        AlarmMonitorError::TransportConnection(err.to_string())
    }
}

/// 브로커가 `ACCESS_REFUSED`로 응답했는지 확인합니다.
///
/// 로그인 단계에서 연결이 끊기면 프로토콜 에러 대신 다른 variant로 올 수 있어
/// 메시지 검사를 보조로 둡니다.
fn is_authentication_failure(err: &lapin::Error) -> bool {
    if matches!(
        err,
        lapin::Error::ProtocolError(e)
            if matches!(e.kind(), AMQPErrorKind::Soft(AMQPSoftError::ACCESSREFUSED))
    ) {
        return true;
    }
    let message = err.to_string();
    message.contains("ACCESS_REFUSED") || message.to_lowercase().contains("authentication")
}

fn classify_send_error(err: lapin::Error) -> AlarmMonitorError {
    match err {
        lapin::Error::SerialisationError(e) => {
            AlarmMonitorError::InvalidAlarm(format!("serialisation failed: {e:?}"))
        }
        other => AlarmMonitorError::ConnectionClosed(other.to_string()),
    }
}

/// 테스트용 Mock 알람 전송
///
/// 보낸 알람을 기록하고, 특정 순번의 전송을 실패시킬 수 있습니다.
/// 순번은 성공/실패를 포함한 전체 `send` 호출 기준(0부터)입니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockAlarmTransport {
    sent: std::sync::Mutex<Vec<AlarmRecord>>,
    calls: std::sync::atomic::AtomicUsize,
    invalid_at: Vec<usize>,
    closed_from: Option<usize>,
}

#[cfg(test)]
impl MockAlarmTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `n`번째 호출을 `InvalidAlarm`으로 실패시킵니다.
    pub fn with_invalid_at(mut self, n: usize) -> Self {
        self.invalid_at.push(n);
        self
    }

    /// `n`번째 호출부터 `ConnectionClosed`로 실패시킵니다.
    pub fn with_closed_from(mut self, n: usize) -> Self {
        self.closed_from = Some(n);
        self
    }

    /// 성공적으로 보낸 알람
    pub fn sent(&self) -> Vec<AlarmRecord> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// 전체 호출 횟수
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl AlarmTransport for MockAlarmTransport {
    async fn send(&self, alarm: &AlarmRecord) -> Result<(), AlarmMonitorError> {
        let call = self
            .calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.closed_from.is_some_and(|n| call >= n) {
            return Err(AlarmMonitorError::ConnectionClosed(
                "mock connection closed".to_owned(),
            ));
        }
        if self.invalid_at.contains(&call) {
            return Err(AlarmMonitorError::InvalidAlarm("mock invalid alarm".to_owned()));
        }
        alarm.validate()?;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(alarm.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lapin::ChannelState;
    use lapin::protocol::AMQPError;

    use super::*;

    #[test]
    fn settings_from_core_defaults() {
        let settings = AmqpSettings::from_core(&AlarmBusConfig::default());
        assert_eq!(settings.host, "rabbitmq");
        assert_eq!(settings.port, 5672);
        assert_eq!(settings.routing_key, "alarms");
        assert!(settings.exchange.is_empty());
    }

    #[test]
    fn uri_carries_credentials_verbatim() {
        let settings = AmqpSettings {
            password: "p@ss/word".to_owned(),
            vhost: "dojot".to_owned(),
            ..AmqpSettings::from_core(&AlarmBusConfig::default())
        };
        let uri = settings.uri();
        assert_eq!(uri.authority.host, "rabbitmq");
        assert_eq!(uri.authority.port, 5672);
        assert_eq!(uri.authority.userinfo.username, "guest");
        assert_eq!(uri.authority.userinfo.password, "p@ss/word");
        assert_eq!(uri.vhost, "dojot");
    }

    #[test]
    fn settings_debug_hides_password() {
        let settings = AmqpSettings {
            password: "s3cret".to_owned(),
            ..AmqpSettings::from_core(&AlarmBusConfig::default())
        };
        assert!(!format!("{settings:?}").contains("s3cret"));
    }

    fn protocol_error(kind: AMQPErrorKind, message: &str) -> lapin::Error {
        lapin::Error::ProtocolError(AMQPError::new(kind, message.into()))
    }

    #[test]
    fn access_refused_is_authentication() {
        let err = protocol_error(
            AMQPErrorKind::Soft(AMQPSoftError::ACCESSREFUSED),
            "Login was refused",
        );
        assert!(is_authentication_failure(&err));
        assert!(matches!(
            classify_open_error(err),
            AlarmMonitorError::Authentication(_)
        ));
    }

    #[test]
    fn other_protocol_errors_are_connection_failures() {
        let err = protocol_error(AMQPErrorKind::Soft(AMQPSoftError::NOTFOUND), "no exchange");
        assert!(!is_authentication_failure(&err));
        assert!(matches!(
            classify_open_error(err),
            AlarmMonitorError::TransportConnection(_)
        ));
    }

    #[test]
    fn io_error_is_connection_failure() {
        let err = lapin::Error::IOError(Arc::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )));
        assert!(matches!(
            classify_open_error(err),
            AlarmMonitorError::TransportConnection(_)
        ));
    }

    #[test]
    fn authentication_message_falls_back_to_text() {
        let err = lapin::Error::IOError(Arc::new(std::io::Error::other(
            "ACCESS_REFUSED - Login was refused using authentication mechanism PLAIN",
        )));
        assert!(is_authentication_failure(&err));
    }

    #[test]
    fn closed_channel_on_send_is_fatal() {
        let err = classify_send_error(lapin::Error::InvalidChannelState(ChannelState::Closed));
        assert!(matches!(err, AlarmMonitorError::ConnectionClosed(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn serialisation_failure_on_send_discards_alarm() {
        let err = classify_send_error(lapin::Error::SerialisationError(Arc::new(
            cookie_factory::GenError::CustomError(0),
        )));
        assert!(matches!(err, AlarmMonitorError::InvalidAlarm(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn mock_records_and_fails_on_schedule() {
        use crate::event::{ContainerAction, RawEvent};
        use dockermon_core::types::AlarmSeverity;

        let alarm = AlarmRecord::from_event(
            &RawEvent::new(ContainerAction::Start, 10, "web", "nginx"),
            "container went up",
            AlarmSeverity::Clear,
            "Unknown".to_owned(),
        );
        let transport = MockAlarmTransport::new()
            .with_invalid_at(1)
            .with_closed_from(2);

        assert!(transport.send(&alarm).await.is_ok());
        assert!(matches!(
            transport.send(&alarm).await,
            Err(AlarmMonitorError::InvalidAlarm(_))
        ));
        assert!(matches!(
            transport.send(&alarm).await,
            Err(AlarmMonitorError::ConnectionClosed(_))
        ));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.calls(), 3);
    }
}
