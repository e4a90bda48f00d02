//! 이벤트 분류기 -- 컨테이너 이벤트를 알람으로 변환
//!
//! 액션별 설명과 심각도는 정적 테이블 [`CLASSIFICATIONS`]로 결정됩니다.
//!
//! | action | description | severity |
//! |---|---|---|
//! | die, stop | container went down | Major |
//! | start | container went up | Clear |
//! | pause | container processes were paused | Major |
//! | unpause | container processes were unpaused | Clear |
//!
//! 테이블에 없는 액션은 알람이 되지 않습니다.

use dockermon_core::types::AlarmSeverity;

use crate::alarm::AlarmRecord;
use crate::docker::DockerClient;
use crate::event::{ContainerAction, RawEvent};
use crate::resolver::ImageResolver;

/// 액션 하나에 대한 분류 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub description: &'static str,
    pub severity: AlarmSeverity,
}

/// 액션 → (설명, 심각도) 정적 테이블
pub static CLASSIFICATIONS: [(ContainerAction, Classification); 5] = [
    (
        ContainerAction::Die,
        Classification {
            description: "container went down",
            severity: AlarmSeverity::Major,
        },
    ),
    (
        ContainerAction::Stop,
        Classification {
            description: "container went down",
            severity: AlarmSeverity::Major,
        },
    ),
    (
        ContainerAction::Start,
        Classification {
            description: "container went up",
            severity: AlarmSeverity::Clear,
        },
    ),
    (
        ContainerAction::Pause,
        Classification {
            description: "container processes were paused",
            severity: AlarmSeverity::Major,
        },
    ),
    (
        ContainerAction::Unpause,
        Classification {
            description: "container processes were unpaused",
            severity: AlarmSeverity::Clear,
        },
    ),
];

/// 액션의 분류를 조회합니다. 알람 대상이 아니면 `None`.
pub fn classify_action(action: &ContainerAction) -> Option<Classification> {
    CLASSIFICATIONS
        .iter()
        .find(|(candidate, _)| candidate == action)
        .map(|(_, classification)| *classification)
}

/// 이벤트 분류기
///
/// 정적 테이블로 액션을 분류하고, 알람이 되는 이벤트에 한해서만
/// 이미지 ID를 조회합니다. 조회 실패는 `"Unknown"`으로 흡수됩니다.
pub struct Classifier<D: DockerClient> {
    resolver: ImageResolver<D>,
}

impl<D: DockerClient> Classifier<D> {
    pub fn new(resolver: ImageResolver<D>) -> Self {
        Self { resolver }
    }

    /// 이벤트를 알람으로 변환합니다.
    pub async fn classify(&self, event: &RawEvent) -> Option<AlarmRecord> {
        let classification = classify_action(&event.action)?;
        let image_id = self.resolver.resolve(&event.image_name).await;
        Some(AlarmRecord::from_event(
            event,
            classification.description,
            classification.severity,
            image_id,
        ))
    }
}
