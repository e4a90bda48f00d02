//! 이미지 메타데이터 조회 -- 이미지 이름을 콘텐츠 ID로 변환
//!
//! 조회는 best-effort입니다. 이미지가 없거나, 타임아웃이 나거나, Docker API가
//! 실패하면 모두 [`UNKNOWN_IMAGE_ID`]를 돌려주며 에러를 밖으로 내보내지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use dockermon_core::metrics as m;

use crate::docker::DockerClient;
use crate::error::AlarmMonitorError;

/// 조회에 실패했을 때의 이미지 ID
pub const UNKNOWN_IMAGE_ID: &str = "Unknown";

/// 이미지 메타데이터 조회기
pub struct ImageResolver<D: DockerClient> {
    docker: Arc<D>,
    timeout: Duration,
}

impl<D: DockerClient> ImageResolver<D> {
    pub fn new(docker: Arc<D>, timeout: Duration) -> Self {
        Self { docker, timeout }
    }

    /// 이미지 이름을 콘텐츠 ID로 변환합니다. 실패하면 `"Unknown"`을 반환합니다.
    pub async fn resolve(&self, image: &str) -> String {
        match self.try_resolve(image).await {
            Ok(id) => id,
            Err(e) => {
                counter!(m::IMAGE_LOOKUP_FAILURES_TOTAL).increment(1);
                match e {
                    AlarmMonitorError::ImageNotFound(_) => {
                        debug!(image, "image not found, using Unknown image id");
                    }
                    other => {
                        warn!(image, error = %other, "image lookup failed, using Unknown image id");
                    }
                }
                UNKNOWN_IMAGE_ID.to_owned()
            }
        }
    }

    async fn try_resolve(&self, image: &str) -> Result<String, AlarmMonitorError> {
        if image.is_empty() {
            return Err(AlarmMonitorError::ImageNotFound(String::new()));
        }

        tokio::time::timeout(self.timeout, self.docker.inspect_image(image))
            .await
            .map_err(|_| {
                AlarmMonitorError::ImageLookup(format!(
                    "lookup timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })?
    }
}
