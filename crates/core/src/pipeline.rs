//! 파이프라인 trait -- 모듈 생명주기 정의

use std::future::Future;

use crate::error::DockermonError;

/// 백그라운드에서 실행되는 모듈의 생명주기 trait
///
/// 데몬은 이 trait을 통해 모듈을 시작하고 정지합니다.
/// `start()`는 작업을 스폰한 직후 반환해야 하며, 블로킹하지 않습니다.
pub trait Pipeline: Send {
    /// 모듈을 시작합니다.
    ///
    /// 이미 실행 중이면 `PipelineError::AlreadyRunning`을 반환합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), DockermonError>> + Send;

    /// 모듈을 정지합니다.
    ///
    /// 실행 중이 아니면 `PipelineError::NotRunning`을 반환합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), DockermonError>> + Send;

    /// 모듈이 실행 중인지 확인합니다.
    fn is_running(&self) -> bool;
}
