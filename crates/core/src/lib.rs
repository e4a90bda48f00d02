//! dockermon 공통 크레이트
//!
//! 모든 dockermon 크레이트가 공유하는 에러, 설정, 생명주기 trait,
//! 도메인 타입과 메트릭 이름을 정의합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{AlarmError, ConfigError, DockermonError, PipelineError};

// 설정
pub use config::DockermonConfig;

// 파이프라인 trait
pub use pipeline::Pipeline;

// 도메인 타입
pub use types::AlarmSeverity;
