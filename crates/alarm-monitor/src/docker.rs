//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait covers the three runtime operations the engine
//! needs: a time-ranged container event stream, an image lookup and a ping.
//! Production code uses [`BollardDockerClient`] while tests use `MockDockerClient`.
//!
//! # Architecture
//!
//! ```text
//!  AlignmentEngine   LiveDispatcher   ImageResolver
//!         \                |               /
//!          \               |              /
//!           +------ DockerClient ------+    (trait)
//!                    |          |
//!                    ▼          ▼
//!                 Bollard      Mock
//!                    |
//!                    ▼
//!              Docker Daemon
//! ```
//!
//! # Examples
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use dockermon_alarm_monitor::{BollardDockerClient, DockerClient, EventWindow};
//!
//! let client = BollardDockerClient::connect_with_socket("/var/run/docker.sock", 120)?;
//! let mut events = client.events(EventWindow::live(1_700_000_000));
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event?);
//! }
//! # Ok::<(), dockermon_alarm_monitor::AlarmMonitorError>(())
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::future;
use futures_util::stream::BoxStream;
use tracing::debug;

use crate::config::AlarmMonitorConfig;
use crate::error::AlarmMonitorError;
use crate::event::{EventWindow, RawEvent};

/// Trait abstracting Docker API operations.
///
/// The trait is `Send + Sync + 'static`, allowing it to be shared with the
/// monitor's background task through an `Arc`.
///
/// # Error Handling
///
/// - **Stream failures**: yielded as `AlarmMonitorError::EventSource` items
/// - **404 on image lookup**: `AlarmMonitorError::ImageNotFound`
/// - **Other lookup failures**: `AlarmMonitorError::ImageLookup`
/// - **Unreachable daemon**: `AlarmMonitorError::DockerConnection`
pub trait DockerClient: Send + Sync + 'static {
    /// Streams container events inside `window`.
    ///
    /// A bounded window ends after the last historical event; a live window
    /// stays open until the daemon closes the connection. Calling it again
    /// re-subscribes from the new window's `since`.
    fn events(&self, window: EventWindow) -> BoxStream<'_, Result<RawEvent, AlarmMonitorError>>;

    /// Resolves an image reference to its content id (`sha256:...`).
    fn inspect_image(
        &self,
        image: &str,
    ) -> impl Future<Output = Result<String, AlarmMonitorError>> + Send;

    /// Checks Docker daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), AlarmMonitorError>> + Send;
}

impl<D: DockerClient> DockerClient for Arc<D> {
    fn events(&self, window: EventWindow) -> BoxStream<'_, Result<RawEvent, AlarmMonitorError>> {
        self.as_ref().events(window)
    }

    fn inspect_image(
        &self,
        image: &str,
    ) -> impl Future<Output = Result<String, AlarmMonitorError>> + Send {
        self.as_ref().inspect_image(image)
    }

    fn ping(&self) -> impl Future<Output = Result<(), AlarmMonitorError>> + Send {
        self.as_ref().ping()
    }
}

/// Production Docker client implementation using `bollard`.
///
/// The request timeout also bounds every event subscription: bollard drops
/// the stream after `timeout_secs`, and the live loop re-subscribes from its
/// watermark.
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects using the monitor's `docker_socket` and `docker_timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns `AlarmMonitorError::DockerConnection` if the client cannot be created.
    pub fn from_config(config: &AlarmMonitorConfig) -> Result<Self, AlarmMonitorError> {
        Self::connect_with_socket(&config.docker_socket, config.docker_timeout_secs)
    }

    /// Connects to Docker using a specific socket path.
    ///
    /// # Errors
    ///
    /// Returns `AlarmMonitorError::DockerConnection` if the client cannot be created.
    pub fn connect_with_socket(
        socket_path: &str,
        timeout_secs: u64,
    ) -> Result<Self, AlarmMonitorError> {
        let docker = bollard::Docker::connect_with_socket(
            socket_path,
            timeout_secs,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| {
            AlarmMonitorError::DockerConnection(format!(
                "failed to connect to docker at {socket_path}: {e}"
            ))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

impl DockerClient for BollardDockerClient {
    fn events(&self, window: EventWindow) -> BoxStream<'_, Result<RawEvent, AlarmMonitorError>> {
        use bollard::system::EventsOptions;

        let options = EventsOptions::<String> {
            since: Some(window.since_param()),
            until: window.until_param(),
            filters: HashMap::from([("type".to_owned(), vec!["container".to_owned()])]),
        };

        self.docker
            .events(Some(options))
            .filter_map(|item| {
                future::ready(match item {
                    Ok(message) => match RawEvent::from_message(message) {
                        Some(event) => Some(Ok(event)),
                        None => {
                            debug!("skipping container event without action or time");
                            None
                        }
                    },
                    Err(e) => Some(Err(AlarmMonitorError::EventSource(format!(
                        "event stream failed: {e}"
                    )))),
                })
            })
            .boxed()
    }

    async fn inspect_image(&self, image: &str) -> Result<String, AlarmMonitorError> {
        let details = self.docker.inspect_image(image).await.map_err(|e| {
            if e.to_string().contains("404") {
                AlarmMonitorError::ImageNotFound(image.to_owned())
            } else {
                AlarmMonitorError::ImageLookup(format!("inspect image '{image}' failed: {e}"))
            }
        })?;

        details
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AlarmMonitorError::ImageLookup(format!("image '{image}' has no id")))
    }

    async fn ping(&self) -> Result<(), AlarmMonitorError> {
        self.docker
            .ping()
            .await
            .map_err(|e| AlarmMonitorError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// 테스트용 Mock Docker 클라이언트
///
/// - 제한된 윈도우(`until` 있음) 요청에는 `history`에서 윈도우 안의 이벤트를 돌려줍니다.
/// - 라이브 요청에는 `live` 스크립트를 구독 순서대로 하나씩 소비합니다.
///   스크립트가 모두 소비되면 영원히 대기하는 스트림을 돌려줍니다.
/// - 모든 구독 윈도우를 기록합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    history: Vec<RawEvent>,
    history_fails: bool,
    live: std::sync::Mutex<std::collections::VecDeque<Vec<Result<RawEvent, AlarmMonitorError>>>>,
    images: HashMap<String, String>,
    slow_images: bool,
    images_fail: bool,
    ping_fails: bool,
    windows: std::sync::Mutex<Vec<EventWindow>>,
    lookups: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockDockerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 과거 이벤트를 설정합니다.
    pub fn with_history(mut self, events: Vec<RawEvent>) -> Self {
        self.history = events;
        self
    }

    /// 과거 이벤트를 모두 보낸 뒤 스트림 에러를 내도록 설정합니다.
    pub fn with_failing_history(mut self) -> Self {
        self.history_fails = true;
        self
    }

    /// 라이브 구독 하나에 해당하는 스크립트를 추가합니다.
    pub fn with_live(self, items: Vec<Result<RawEvent, AlarmMonitorError>>) -> Self {
        if let Ok(mut live) = self.live.lock() {
            live.push_back(items);
        }
        self
    }

    /// 이미지 이름과 ID를 등록합니다.
    pub fn with_image(mut self, name: &str, id: &str) -> Self {
        self.images.insert(name.to_owned(), id.to_owned());
        self
    }

    /// 이미지 조회가 응답하지 않도록 설정합니다.
    pub fn with_slow_images(mut self) -> Self {
        self.slow_images = true;
        self
    }

    /// 이미지 조회가 전송 에러(`ImageLookup`)로 실패하도록 설정합니다.
    pub fn with_failing_images(mut self) -> Self {
        self.images_fail = true;
        self
    }

    /// ping이 실패하도록 설정합니다.
    pub fn with_failing_ping(mut self) -> Self {
        self.ping_fails = true;
        self
    }

    /// 지금까지 요청된 구독 윈도우
    pub fn windows(&self) -> Vec<EventWindow> {
        self.windows.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// 이미지 조회 호출 횟수
    pub fn lookups(&self) -> usize {
        self.lookups.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    fn events(&self, window: EventWindow) -> BoxStream<'_, Result<RawEvent, AlarmMonitorError>> {
        if let Ok(mut windows) = self.windows.lock() {
            windows.push(window);
        }

        if !window.is_live() {
            let mut items: Vec<Result<RawEvent, AlarmMonitorError>> = self
                .history
                .iter()
                .filter(|e| window.contains(e.timestamp))
                .cloned()
                .map(Ok)
                .collect();
            if self.history_fails {
                items.push(Err(AlarmMonitorError::EventSource(
                    "mock history failure".to_owned(),
                )));
            }
            return futures_util::stream::iter(items).boxed();
        }

        let script = self.live.lock().ok().and_then(|mut live| live.pop_front());
        match script {
            Some(items) => futures_util::stream::iter(items.into_iter().filter(move |item| {
                item.as_ref().map_or(true, |e| window.contains(e.timestamp))
            }))
            .boxed(),
            None => futures_util::stream::pending().boxed(),
        }
    }

    async fn inspect_image(&self, image: &str) -> Result<String, AlarmMonitorError> {
        self.lookups
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.slow_images {
            std::future::pending::<()>().await;
        }
        if self.images_fail {
            return Err(AlarmMonitorError::ImageLookup("socket reset".to_owned()));
        }
        self.images
            .get(image)
            .cloned()
            .ok_or_else(|| AlarmMonitorError::ImageNotFound(image.to_owned()))
    }

    async fn ping(&self) -> Result<(), AlarmMonitorError> {
        if self.ping_fails {
            return Err(AlarmMonitorError::DockerConnection(
                "mock ping failure".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ContainerAction;

    fn start(ts: i64, name: &str) -> RawEvent {
        RawEvent::new(ContainerAction::Start, ts, name, "nginx")
    }

    #[tokio::test]
    async fn mock_history_respects_window() {
        let client = MockDockerClient::new().with_history(vec![
            start(5, "a"),
            start(10, "b"),
            start(20, "c"),
        ]);
        let events: Vec<_> = client
            .events(EventWindow::bounded(6, 20))
            .collect::<Vec<_>>()
            .await;
        let names: Vec<_> = events
            .into_iter()
            .map(|e| e.unwrap().container_name)
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn mock_history_failure_comes_last() {
        let client = MockDockerClient::new()
            .with_history(vec![start(5, "a")])
            .with_failing_history();
        let events: Vec<_> = client
            .events(EventWindow::bounded(0, 10))
            .collect::<Vec<_>>()
            .await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(events[1].is_err());
    }

    #[tokio::test]
    async fn mock_live_scripts_are_consumed_in_order() {
        let client = MockDockerClient::new()
            .with_live(vec![Ok(start(5, "a"))])
            .with_live(vec![Ok(start(8, "b"))]);

        let first: Vec<_> = client.events(EventWindow::live(0)).collect::<Vec<_>>().await;
        let second: Vec<_> = client.events(EventWindow::live(6)).collect::<Vec<_>>().await;
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(client.windows(), vec![EventWindow::live(0), EventWindow::live(6)]);
    }

    #[tokio::test]
    async fn mock_live_filters_events_before_since() {
        let client = MockDockerClient::new().with_live(vec![Ok(start(5, "a")), Ok(start(9, "b"))]);
        let events: Vec<_> = client.events(EventWindow::live(6)).collect::<Vec<_>>().await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn mock_inspect_image() {
        let client = MockDockerClient::new().with_image("nginx", "sha256:1");
        assert_eq!(client.inspect_image("nginx").await.unwrap(), "sha256:1");
        assert!(matches!(
            client.inspect_image("redis").await,
            Err(AlarmMonitorError::ImageNotFound(_))
        ));
        assert_eq!(client.lookups(), 2);
    }

    #[tokio::test]
    async fn mock_failing_images() {
        let client = MockDockerClient::new()
            .with_image("nginx", "sha256:1")
            .with_failing_images();
        assert!(matches!(
            client.inspect_image("nginx").await,
            Err(AlarmMonitorError::ImageLookup(_))
        ));
    }

    #[tokio::test]
    async fn mock_ping() {
        assert!(MockDockerClient::new().ping().await.is_ok());
        assert!(MockDockerClient::new().with_failing_ping().ping().await.is_err());
    }

    #[tokio::test]
    async fn bollard_client_from_config() {
        let config = crate::config::AlarmMonitorConfigBuilder::new()
            .docker_socket("/tmp/dockermon-test.sock")
            .docker_timeout_secs(5)
            .build()
            .unwrap();
        assert!(BollardDockerClient::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn arc_client_delegates() {
        let client = Arc::new(MockDockerClient::new().with_image("nginx", "sha256:1"));
        assert_eq!(client.inspect_image("nginx").await.unwrap(), "sha256:1");
        assert_eq!(client.lookups(), 1);
    }
}
