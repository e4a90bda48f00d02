//! dockermon 알람 모니터 엔진
//!
//! Docker 컨테이너 생명주기 이벤트를 분류하여 알람 버스(RabbitMQ)로 전달합니다.
//!
//! # Module Structure
//!
//! - [`error`]: 도메인 에러 타입 (`AlarmMonitorError`)
//! - [`config`]: 모니터 설정 (`AlarmMonitorConfig`, 빌더)
//! - [`event`]: 원본 이벤트와 조회 윈도우 (`RawEvent`, `ContainerAction`, `EventWindow`)
//! - [`alarm`]: 알람 레코드 (`AlarmRecord`)
//! - [`docker`]: Docker API 추상화 (`DockerClient` trait, `BollardDockerClient`)
//! - [`resolver`]: 이미지 ID 조회 (`ImageResolver`)
//! - [`classifier`]: 액션별 심각도/설명 매핑 (`Classifier`)
//! - [`watermark`]: 이벤트 시각 경계 (`Watermark`)
//! - [`transport`]: 알람 전송 (`AlarmTransport` trait, `AmqpAlarmTransport`)
//! - [`alignment`]: 시작 시 알람 상태 정렬 (`AlignmentEngine`)
//! - [`dispatch`]: 라이브 이벤트 디스패치 (`LiveDispatcher`)
//! - [`monitor`]: 오케스트레이터 (`AlarmMonitor`, `AlarmMonitorBuilder`)
//!
//! # Architecture
//!
//! ```text
//! Docker events ──> Classifier ──┬─> AlignmentEngine (시작 시 1회)
//!                       |        │
//!                 ImageResolver  └─> LiveDispatcher (워터마크부터 계속)
//!                                          |
//!                                   AlarmTransport ──> RabbitMQ
//! ```

pub mod alarm;
pub mod alignment;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod docker;
pub mod error;
pub mod event;
pub mod monitor;
pub mod resolver;
pub mod transport;
pub mod watermark;

// --- Public API Re-exports ---

// Monitor (main orchestrator)
pub use monitor::{AlarmMonitor, AlarmMonitorBuilder};

// Configuration
pub use config::{AlarmMonitorConfig, AlarmMonitorConfigBuilder};

// Error
pub use error::AlarmMonitorError;

// Events and alarms
pub use alarm::AlarmRecord;
pub use event::{ContainerAction, EventWindow, RawEvent};

// Docker API
pub use docker::{BollardDockerClient, DockerClient};

// Classification
pub use classifier::{Classification, Classifier, classify_action};
pub use resolver::{ImageResolver, UNKNOWN_IMAGE_ID};

// Alignment and live dispatch
pub use alignment::{AlignmentEngine, AlignmentReport};
pub use dispatch::{Delivery, LiveDispatcher, SubscriptionEnd};
pub use watermark::Watermark;

// Transport
pub use transport::{AlarmTransport, AmqpAlarmTransport, AmqpSettings};
