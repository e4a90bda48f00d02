//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `dockermon_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use dockermon_core::metrics;
//! use metrics::counter;
//!
//! counter!(metrics::ALARMS_SENT_TOTAL, metrics::LABEL_SEVERITY => severity.as_str()).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 처리 단계 레이블 키 (alignment, live)
pub const LABEL_PHASE: &str = "phase";

/// 심각도 레이블 키 (Major, Clear)
pub const LABEL_SEVERITY: &str = "severity";

/// 정렬 단계 레이블 값
pub const PHASE_ALIGNMENT: &str = "alignment";

/// 라이브 디스패치 단계 레이블 값
pub const PHASE_LIVE: &str = "live";

// ─── Alarm Monitor 메트릭 ───────────────────────────────────────────

/// 수신한 Docker 이벤트 수 (counter, label: phase)
pub const EVENTS_RECEIVED_TOTAL: &str = "dockermon_events_received_total";

/// 전송에 성공한 알람 수 (counter, label: severity)
pub const ALARMS_SENT_TOTAL: &str = "dockermon_alarms_sent_total";

/// 잘못된 페이로드로 버려진 알람 수 (counter)
pub const ALARMS_DISCARDED_TOTAL: &str = "dockermon_alarms_discarded_total";

/// 이미지 ID 조회 실패 수 (counter)
pub const IMAGE_LOOKUP_FAILURES_TOTAL: &str = "dockermon_image_lookup_failures_total";

/// 이벤트 스트림 재구독 수 (counter)
pub const RESUBSCRIPTIONS_TOTAL: &str = "dockermon_resubscriptions_total";

/// 마지막 정렬에서 알람을 보낸 컨테이너 수 (gauge)
pub const CONTAINERS_ALIGNED: &str = "dockermon_containers_aligned";

/// 현재 워터마크 (gauge, Unix epoch 초)
pub const WATERMARK_SECONDS: &str = "dockermon_watermark_seconds";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `dockermon-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        EVENTS_RECEIVED_TOTAL,
        "Container lifecycle events received, by phase (alignment, live)"
    );
    describe_counter!(
        ALARMS_SENT_TOTAL,
        "Alarms acknowledged by the alarm bus, by severity"
    );
    describe_counter!(
        ALARMS_DISCARDED_TOTAL,
        "Alarms discarded because the payload was rejected as invalid"
    );
    describe_counter!(
        IMAGE_LOOKUP_FAILURES_TOTAL,
        "Image id lookups that fell back to Unknown"
    );
    describe_counter!(
        RESUBSCRIPTIONS_TOTAL,
        "Times the live event subscription was re-opened from the watermark"
    );
    describe_gauge!(
        CONTAINERS_ALIGNED,
        "Distinct containers forwarded by the last alignment pass"
    );
    describe_gauge!(
        WATERMARK_SECONDS,
        "Next unprocessed event timestamp in Unix seconds"
    );
}
