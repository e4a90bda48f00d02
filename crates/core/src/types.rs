//! 도메인 타입 -- 크레이트 간에 공유되는 공통 타입

use std::fmt;

use serde::{Deserialize, Serialize};

/// 알람 심각도
///
/// 알람 관리 시스템이 이해하는 두 가지 상태만 사용합니다.
/// `Major`는 문제 상태, `Clear`는 복구된 정상 상태입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmSeverity {
    /// 문제 상태 (컨테이너 중단, 일시정지)
    Major,
    /// 정상 상태로 복구됨 (컨테이너 시작, 일시정지 해제)
    Clear,
}

impl AlarmSeverity {
    /// 직렬화/메트릭 레이블에 쓰이는 문자열 표현
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "Major",
            Self::Clear => "Clear",
        }
    }

    /// 문제 상태를 나타내는지 여부
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Major)
    }
}

impl fmt::Display for AlarmSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
