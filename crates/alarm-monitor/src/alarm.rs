//! 알람 레코드 -- 알람 버스로 전송되는 정규화된 메시지
//!
//! [`AlarmRecord`]는 camelCase JSON으로 직렬화되며 `eventTimestamp`는
//! RFC 3339 UTC 문자열로 표현됩니다.
//!
//! ```json
//! {
//!   "domain": "ContainerError",
//!   "namespace": "dojot.docker",
//!   "severity": "Major",
//!   "description": "container went down",
//!   "eventTimestamp": "2023-11-14T22:13:20Z",
//!   "primarySubject": { "container": "web", "image": "nginx:1.25" },
//!   "additionalData": { "exitCode": "137", "imageId": "sha256:..." }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use dockermon_core::types::AlarmSeverity;

use crate::error::AlarmMonitorError;
use crate::event::RawEvent;

/// 알람 도메인 (고정값)
pub const ALARM_DOMAIN: &str = "ContainerError";
/// 알람 네임스페이스 (고정값)
pub const ALARM_NAMESPACE: &str = "dojot.docker";

/// `primarySubject` 키: 컨테이너 이름
pub const SUBJECT_CONTAINER: &str = "container";
/// `primarySubject` 키: 이미지 이름
pub const SUBJECT_IMAGE: &str = "image";
/// `additionalData` 키: 종료 코드
pub const DATA_EXIT_CODE: &str = "exitCode";
/// `additionalData` 키: 이미지 ID
pub const DATA_IMAGE_ID: &str = "imageId";

/// 종료 코드가 없는 이벤트의 `exitCode` 값
pub const EXIT_CODE_NOT_AVAILABLE: &str = "NA";

/// 정규화된 알람 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmRecord {
    pub domain: String,
    pub namespace: String,
    pub severity: AlarmSeverity,
    pub description: String,
    /// 원본 이벤트 시각 (Unix 초)
    #[serde(serialize_with = "serialize_timestamp")]
    pub event_timestamp: i64,
    pub primary_subject: BTreeMap<String, String>,
    pub additional_data: BTreeMap<String, String>,
}

impl AlarmRecord {
    /// 분류된 이벤트에서 알람을 만듭니다.
    ///
    /// `primarySubject.container`는 항상 이벤트의 컨테이너 이름이며 정렬 키로 쓰입니다.
    pub fn from_event(
        event: &RawEvent,
        description: &str,
        severity: AlarmSeverity,
        image_id: String,
    ) -> Self {
        let primary_subject = BTreeMap::from([
            (SUBJECT_CONTAINER.to_owned(), event.container_name.clone()),
            (SUBJECT_IMAGE.to_owned(), event.image_name.clone()),
        ]);
        let additional_data = BTreeMap::from([
            (
                DATA_EXIT_CODE.to_owned(),
                event
                    .exit_code
                    .clone()
                    .unwrap_or_else(|| EXIT_CODE_NOT_AVAILABLE.to_owned()),
            ),
            (DATA_IMAGE_ID.to_owned(), image_id),
        ]);

        Self {
            domain: ALARM_DOMAIN.to_owned(),
            namespace: ALARM_NAMESPACE.to_owned(),
            severity,
            description: description.to_owned(),
            event_timestamp: event.timestamp,
            primary_subject,
            additional_data,
        }
    }

    /// 정렬 키 (컨테이너 이름)
    pub fn container(&self) -> &str {
        self.subject(SUBJECT_CONTAINER)
    }

    pub fn image(&self) -> &str {
        self.subject(SUBJECT_IMAGE)
    }

    pub fn exit_code(&self) -> &str {
        self.data(DATA_EXIT_CODE)
    }

    pub fn image_id(&self) -> &str {
        self.data(DATA_IMAGE_ID)
    }

    fn subject(&self, key: &str) -> &str {
        self.primary_subject.get(key).map_or("", String::as_str)
    }

    fn data(&self, key: &str) -> &str {
        self.additional_data.get(key).map_or("", String::as_str)
    }

    /// 전송 전 알람 형식을 검증합니다.
    ///
    /// 실패하면 `InvalidAlarm`을 반환하며, 해당 알람은 부분 전송 없이 폐기됩니다.
    pub fn validate(&self) -> Result<(), AlarmMonitorError> {
        if self.domain.is_empty() {
            return Err(AlarmMonitorError::InvalidAlarm("empty domain".to_owned()));
        }
        if self.namespace.is_empty() {
            return Err(AlarmMonitorError::InvalidAlarm(
                "empty namespace".to_owned(),
            ));
        }
        if self.description.is_empty() {
            return Err(AlarmMonitorError::InvalidAlarm(
                "empty description".to_owned(),
            ));
        }
        if self.container().is_empty() {
            return Err(AlarmMonitorError::InvalidAlarm(
                "primarySubject.container is empty".to_owned(),
            ));
        }
        if timestamp_to_utc(self.event_timestamp).is_none() {
            return Err(AlarmMonitorError::InvalidAlarm(format!(
                "eventTimestamp {} is not representable",
                self.event_timestamp
            )));
        }
        Ok(())
    }

    /// 검증 후 JSON 페이로드로 직렬화합니다.
    pub fn to_json(&self) -> Result<Vec<u8>, AlarmMonitorError> {
        self.validate()?;
        serde_json::to_vec(self).map_err(|e| AlarmMonitorError::InvalidAlarm(e.to_string()))
    }
}

fn timestamp_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    if secs < 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(secs, 0)
}

fn serialize_timestamp<S: Serializer>(secs: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    let ts = timestamp_to_utc(*secs).ok_or_else(|| {
        serde::ser::Error::custom(format!("timestamp {secs} is out of range"))
    })?;
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}
