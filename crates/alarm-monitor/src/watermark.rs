//! 워터마크 -- 다음에 처리할 이벤트 시각의 경계
//!
//! 모니터 태스크가 소유하며 정렬 엔진과 라이브 디스패처에 `&mut`로 전달됩니다.
//! 프로세스 수명 동안만 유지되고 디스크에 저장하지 않습니다.
//! 재시작하면 정렬 윈도우부터 다시 읽으므로, 정지 중에 윈도우 밖에서 일어난
//! 이벤트는 놓칠 수 있습니다.

use std::fmt;

/// 단조 증가하는 이벤트 시각 경계 (Unix 초)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(i64);

impl Watermark {
    /// 모니터 시작 시각으로 초기화합니다.
    pub fn new(start: i64) -> Self {
        Self(start)
    }

    /// 다음 구독의 `since` 값
    pub fn get(&self) -> i64 {
        self.0
    }

    /// 이벤트를 받은 직후 호출하여 다음 조회가 이 이벤트를 제외하도록 합니다.
    ///
    /// 이미 더 앞선 값이면 바뀌지 않습니다.
    pub fn advance_past(&mut self, timestamp: i64) {
        self.0 = self.0.max(timestamp.saturating_add(1));
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_to_timestamp_plus_one() {
        let mut watermark = Watermark::new(0);
        for ts in [5, 8, 12] {
            watermark.advance_past(ts);
        }
        assert_eq!(watermark.get(), 13);
    }

    #[test]
    fn never_moves_backwards() {
        let mut watermark = Watermark::new(100);
        watermark.advance_past(50);
        assert_eq!(watermark.get(), 100);
        watermark.advance_past(100);
        assert_eq!(watermark.get(), 101);
    }

    #[test]
    fn saturates_at_max() {
        let mut watermark = Watermark::new(0);
        watermark.advance_past(i64::MAX);
        assert_eq!(watermark.get(), i64::MAX);
    }
}
