//! 정렬 엔진 -- 시작 전 알람 상태 재구성
//!
//! 모니터가 시작되기 전에 일어난 이벤트를 제한된 윈도우로 다시 읽어,
//! 컨테이너마다 마지막 알람 하나만 남긴 뒤 전송합니다.
//!
//! # 동작
//! ```text
//! [since, until] 과거 이벤트 ──> Classifier ──> 컨테이너별 마지막 알람
//!                                                     |
//!                              스트림 정상 종료 후 ──> AlarmTransport
//! ```
//!
//! 과거 이벤트 조회가 중간에 실패하면 모아둔 알람을 버리고 아무것도 보내지 않습니다.

use std::collections::HashMap;

use futures_util::StreamExt;
use metrics::{counter, gauge};
use tracing::{error, info};

use dockermon_core::metrics as m;

use crate::alarm::AlarmRecord;
use crate::classifier::Classifier;
use crate::dispatch::{Delivery, forward};
use crate::docker::DockerClient;
use crate::error::AlarmMonitorError;
use crate::event::EventWindow;
use crate::transport::AlarmTransport;
use crate::watermark::Watermark;

/// 정렬 한 번의 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentReport {
    /// 읽은 과거 이벤트 수
    pub events: usize,
    /// 전송한 알람 수
    pub sent: usize,
    /// 잘못된 알람으로 폐기된 수
    pub discarded: usize,
    /// 조회 실패로 중단되었는지 여부
    pub aborted: bool,
}

/// 정렬 엔진
///
/// 누적기는 컨테이너 이름을 키로 가장 최근 알람을 보관하며, 매 정렬이 끝나면 비워집니다.
#[derive(Debug, Default)]
pub struct AlignmentEngine {
    latest: HashMap<String, AlarmRecord>,
}

impl AlignmentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 누적기에 남아 있는 알람 수
    pub fn pending(&self) -> usize {
        self.latest.len()
    }

    /// `window` 범위의 과거 이벤트로 알람 상태를 정렬합니다.
    ///
    /// 조회 실패는 로그만 남기고 `aborted` 보고서를 돌려줍니다.
    /// 전송 중 치명적 에러가 나면 그대로 반환합니다.
    pub async fn align<D: DockerClient, T: AlarmTransport>(
        &mut self,
        docker: &D,
        classifier: &Classifier<D>,
        transport: &T,
        window: EventWindow,
        watermark: &mut Watermark,
    ) -> Result<AlignmentReport, AlarmMonitorError> {
        self.latest.clear();
        let mut report = AlignmentReport::default();

        info!(
            since = window.since,
            until = ?window.until,
            "aligning alarms with past container events"
        );

        {
            let mut events = docker.events(window);
            while let Some(item) = events.next().await {
                let event = match item {
                    Ok(event) => event,
                    Err(e) => {
                        error!(
                            error = %e,
                            events = report.events,
                            "failed to fetch past container events, skipping alignment"
                        );
                        self.latest.clear();
                        report.aborted = true;
                        return Ok(report);
                    }
                };

                report.events += 1;
                watermark.advance_past(event.timestamp);
                counter!(m::EVENTS_RECEIVED_TOTAL, m::LABEL_PHASE => m::PHASE_ALIGNMENT)
                    .increment(1);

                if let Some(alarm) = classifier.classify(&event).await {
                    self.latest.insert(alarm.container().to_owned(), alarm);
                }
            }
        }

        for (_, alarm) in self.latest.drain() {
            match forward(transport, &alarm, m::PHASE_ALIGNMENT).await? {
                Delivery::Sent => report.sent += 1,
                Delivery::Discarded => report.discarded += 1,
            }
        }

        gauge!(m::CONTAINERS_ALIGNED).set(report.sent as f64);
        info!(
            events = report.events,
            sent = report.sent,
            discarded = report.discarded,
            "alignment finished"
        );
        Ok(report)
    }
}
