//! Container lifecycle events.
//!
//! [`RawEvent`] is the runtime-reported event as the engine sees it, decoupled
//! from bollard's wire model. [`EventWindow`] describes the time range of a
//! subscription: bounded for alignment, open-ended for the live feed.

use std::fmt;

use bollard::models::EventMessage;

/// Docker actor attribute carrying the container name.
const ATTR_NAME: &str = "name";
/// Docker actor attribute carrying the image reference.
const ATTR_IMAGE: &str = "image";
/// Docker actor attribute carrying the exit code of a `die` event.
const ATTR_EXIT_CODE: &str = "exitCode";

/// Container lifecycle action.
///
/// Only the five variants below map to alarms; everything else the daemon
/// reports (`create`, `destroy`, `exec_start: ...`, `health_status: ...`)
/// is kept verbatim in [`ContainerAction::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContainerAction {
    /// 컨테이너 프로세스 종료
    Die,
    /// 컨테이너 정지
    Stop,
    /// 컨테이너 시작
    Start,
    /// 컨테이너 일시정지
    Pause,
    /// 컨테이너 일시정지 해제
    Unpause,
    /// 알람 대상이 아닌 기타 액션
    Other(String),
}

impl ContainerAction {
    /// Docker가 보고하는 액션 문자열을 해석합니다.
    pub fn parse(action: &str) -> Self {
        match action {
            "die" => Self::Die,
            "stop" => Self::Stop,
            "start" => Self::Start,
            "pause" => Self::Pause,
            "unpause" => Self::Unpause,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Die => "die",
            Self::Stop => "stop",
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::Other(action) => action,
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A container lifecycle event as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Lifecycle action
    pub action: ContainerAction,
    /// Event time in Unix seconds
    pub timestamp: i64,
    /// Container name (alignment key)
    pub container_name: String,
    /// Image reference the container was created from
    pub image_name: String,
    /// Exit code, present only for exit actions
    pub exit_code: Option<String>,
}

impl RawEvent {
    /// Creates an event without an exit code.
    pub fn new(
        action: ContainerAction,
        timestamp: i64,
        container_name: impl Into<String>,
        image_name: impl Into<String>,
    ) -> Self {
        Self {
            action,
            timestamp,
            container_name: container_name.into(),
            image_name: image_name.into(),
            exit_code: None,
        }
    }

    /// Attaches an exit code.
    pub fn with_exit_code(mut self, exit_code: impl Into<String>) -> Self {
        self.exit_code = Some(exit_code.into());
        self
    }

    /// Converts a bollard event message.
    ///
    /// Returns `None` when the message has no action or no timestamp, since
    /// such an event can neither be classified nor advance the watermark.
    /// The container name falls back to the actor id when the `name`
    /// attribute is missing.
    pub fn from_message(message: EventMessage) -> Option<Self> {
        let action = ContainerAction::parse(message.action.as_deref()?);
        let timestamp = message.time?;

        let actor = message.actor.unwrap_or_default();
        let mut attributes = actor.attributes.unwrap_or_default();

        let container_name = attributes
            .remove(ATTR_NAME)
            .or(actor.id)
            .unwrap_or_default();
        let image_name = attributes.remove(ATTR_IMAGE).unwrap_or_default();
        let exit_code = attributes.remove(ATTR_EXIT_CODE);

        Some(Self {
            action,
            timestamp,
            container_name,
            image_name,
            exit_code,
        })
    }
}

/// Time range of an event subscription, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    /// Inclusive lower bound
    pub since: i64,
    /// Inclusive upper bound; `None` keeps the stream open for live events
    pub until: Option<i64>,
}

impl EventWindow {
    /// Open-ended live feed starting at `since`.
    pub fn live(since: i64) -> Self {
        Self { since, until: None }
    }

    /// Bounded historical window `[since, until]`.
    pub fn bounded(since: i64, until: i64) -> Self {
        Self {
            since,
            until: Some(until),
        }
    }

    /// Startup alignment window covering the whole seconds before `started_at`.
    ///
    /// The live feed starts at `started_at`. Docker compares the bounds at
    /// nanosecond precision, so [`until_param`](Self::until_param) extends
    /// the last second to its final nanosecond. Returns `None` when alignment
    /// is disabled.
    pub fn alignment(started_at: i64, window_secs: u64) -> Option<Self> {
        if window_secs == 0 {
            return None;
        }
        let window = i64::try_from(window_secs).unwrap_or(i64::MAX);
        let since = started_at.saturating_sub(window).max(0);
        Some(Self::bounded(since, started_at.saturating_sub(1)))
    }

    pub fn is_live(&self) -> bool {
        self.until.is_none()
    }

    /// `since` query value for the Docker events API.
    pub fn since_param(&self) -> String {
        self.since.to_string()
    }

    /// `until` query value for the Docker events API.
    ///
    /// Docker keeps events with `TimeNano <= until`. A bare `"{until}"` would
    /// drop everything after the first nanosecond of that second, and the
    /// live feed only picks up from the next whole second.
    pub fn until_param(&self) -> Option<String> {
        self.until.map(|until| format!("{until}.999999999"))
    }

    /// Whether a timestamp falls inside this window.
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.since && self.until.is_none_or(|until| timestamp <= until)
    }
}
