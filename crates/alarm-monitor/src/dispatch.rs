//! Live dispatch loop.
//!
//! [`LiveDispatcher`] subscribes to the live event feed at the watermark,
//! classifies each event in stream order and forwards the resulting alarms.
//! Losing the subscription is never fatal: the loop waits
//! `resubscribe_delay` and subscribes again from the watermark. A closed
//! alarm bus is fatal and ends the loop with an error.

use std::time::Duration;

use futures_util::StreamExt;
use metrics::{counter, gauge};
use tracing::{debug, error, info, warn};

use dockermon_core::metrics as m;

use crate::alarm::AlarmRecord;
use crate::classifier::Classifier;
use crate::docker::DockerClient;
use crate::error::AlarmMonitorError;
use crate::event::EventWindow;
use crate::transport::AlarmTransport;
use crate::watermark::Watermark;

/// Outcome of a single successful-or-discarded send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The bus acknowledged the alarm.
    Sent,
    /// The alarm was rejected as invalid and dropped.
    Discarded,
}

/// Sends one alarm, absorbing `InvalidAlarm` failures.
///
/// Any other transport failure is returned so the caller can stop.
pub(crate) async fn forward<T: AlarmTransport>(
    transport: &T,
    alarm: &AlarmRecord,
    phase: &'static str,
) -> Result<Delivery, AlarmMonitorError> {
    match transport.send(alarm).await {
        Ok(()) => {
            counter!(m::ALARMS_SENT_TOTAL, m::LABEL_SEVERITY => alarm.severity.as_str())
                .increment(1);
            info!(
                phase,
                container = %alarm.container(),
                severity = %alarm.severity,
                degraded = alarm.severity.is_degraded(),
                description = %alarm.description,
                event_timestamp = alarm.event_timestamp,
                "alarm sent"
            );
            Ok(Delivery::Sent)
        }
        Err(AlarmMonitorError::InvalidAlarm(reason)) => {
            counter!(m::ALARMS_DISCARDED_TOTAL).increment(1);
            warn!(
                phase,
                container = %alarm.container(),
                event_timestamp = alarm.event_timestamp,
                reason = %reason,
                "invalid alarm discarded"
            );
            Ok(Delivery::Discarded)
        }
        Err(e) => {
            error!(
                phase,
                container = %alarm.container(),
                error = %e,
                "alarm transport failed"
            );
            Err(e)
        }
    }
}

/// Why a live subscription stopped delivering events.
#[derive(Debug)]
pub enum SubscriptionEnd {
    /// The daemon closed the stream (request timeout, daemon restart).
    Ended,
    /// The stream yielded an error.
    SourceError(AlarmMonitorError),
}

/// Live dispatch loop over a borrowed event source, classifier and transport.
pub struct LiveDispatcher<'a, D: DockerClient, T: AlarmTransport> {
    docker: &'a D,
    classifier: &'a Classifier<D>,
    transport: &'a T,
    resubscribe_delay: Duration,
}

impl<'a, D: DockerClient, T: AlarmTransport> LiveDispatcher<'a, D, T> {
    pub fn new(
        docker: &'a D,
        classifier: &'a Classifier<D>,
        transport: &'a T,
        resubscribe_delay: Duration,
    ) -> Self {
        Self {
            docker,
            classifier,
            transport,
            resubscribe_delay,
        }
    }

    /// Runs until the alarm transport fails fatally.
    ///
    /// Returns only with an error; subscription loss is retried forever.
    pub async fn run(&self, watermark: &mut Watermark) -> Result<(), AlarmMonitorError> {
        loop {
            match self.run_subscription(watermark).await? {
                SubscriptionEnd::Ended => {
                    info!(%watermark, "event stream ended, resubscribing");
                }
                SubscriptionEnd::SourceError(e) => {
                    warn!(%watermark, error = %e, "event stream failed, resubscribing");
                }
            }
            counter!(m::RESUBSCRIPTIONS_TOTAL).increment(1);
            tokio::time::sleep(self.resubscribe_delay).await;
        }
    }

    /// Consumes one live subscription starting at the watermark.
    pub async fn run_subscription(
        &self,
        watermark: &mut Watermark,
    ) -> Result<SubscriptionEnd, AlarmMonitorError> {
        debug!(since = watermark.get(), "subscribing to live container events");
        let mut events = self.docker.events(EventWindow::live(watermark.get()));

        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => return Ok(SubscriptionEnd::SourceError(e)),
            };

            watermark.advance_past(event.timestamp);
            gauge!(m::WATERMARK_SECONDS).set(watermark.get() as f64);
            counter!(m::EVENTS_RECEIVED_TOTAL, m::LABEL_PHASE => m::PHASE_LIVE).increment(1);

            let Some(alarm) = self.classifier.classify(&event).await else {
                debug!(
                    container = %event.container_name,
                    action = %event.action,
                    "event does not map to an alarm"
                );
                continue;
            };

            forward(self.transport, &alarm, m::PHASE_LIVE).await?;
        }

        Ok(SubscriptionEnd::Ended)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dockermon_core::types::AlarmSeverity;

    use super::*;
    use crate::docker::MockDockerClient;
    use crate::event::{ContainerAction, RawEvent};
    use crate::resolver::ImageResolver;
    use crate::transport::MockAlarmTransport;

    fn event(action: ContainerAction, ts: i64, name: &str) -> RawEvent {
        RawEvent::new(action, ts, name, "nginx")
    }

    fn classifier(docker: &Arc<MockDockerClient>) -> Classifier<MockDockerClient> {
        Classifier::new(ImageResolver::new(
            Arc::clone(docker),
            Duration::from_millis(100),
        ))
    }

    #[tokio::test]
    async fn forwards_in_order_and_advances_watermark() {
        let docker = Arc::new(MockDockerClient::new().with_live(vec![
            Ok(event(ContainerAction::Die, 5, "a")),
            Ok(event(ContainerAction::Start, 8, "b")),
            Ok(event(ContainerAction::Stop, 12, "c")),
        ]));
        let classifier = classifier(&docker);
        let transport = MockAlarmTransport::new();
        let dispatcher =
            LiveDispatcher::new(docker.as_ref(), &classifier, &transport, Duration::ZERO);

        let mut watermark = Watermark::new(0);
        let end = dispatcher.run_subscription(&mut watermark).await.unwrap();

        assert!(matches!(end, SubscriptionEnd::Ended));
        assert_eq!(watermark.get(), 13);
        let timestamps: Vec<_> = transport
            .sent()
            .iter()
            .map(|a| a.event_timestamp)
            .collect();
        assert_eq!(timestamps, vec![5, 8, 12]);
    }

    #[tokio::test]
    async fn ignored_events_still_advance_watermark() {
        let docker = Arc::new(MockDockerClient::new().with_live(vec![
            Ok(event(ContainerAction::parse("create"), 3, "a")),
            Ok(event(ContainerAction::parse("destroy"), 7, "a")),
        ]));
        let classifier = classifier(&docker);
        let transport = MockAlarmTransport::new();
        let dispatcher =
            LiveDispatcher::new(docker.as_ref(), &classifier, &transport, Duration::ZERO);

        let mut watermark = Watermark::new(0);
        dispatcher.run_subscription(&mut watermark).await.unwrap();

        assert_eq!(watermark.get(), 8);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_alarm_does_not_stop_the_loop() {
        let docker = Arc::new(MockDockerClient::new().with_live(vec![
            Ok(event(ContainerAction::Die, 5, "a")),
            Ok(event(ContainerAction::Start, 8, "a")),
        ]));
        let classifier = classifier(&docker);
        let transport = MockAlarmTransport::new().with_invalid_at(0);
        let dispatcher =
            LiveDispatcher::new(docker.as_ref(), &classifier, &transport, Duration::ZERO);

        let mut watermark = Watermark::new(0);
        let end = dispatcher.run_subscription(&mut watermark).await.unwrap();

        assert!(matches!(end, SubscriptionEnd::Ended));
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event_timestamp, 8);
        assert_eq!(sent[0].severity, AlarmSeverity::Clear);
    }

    #[tokio::test]
    async fn closed_connection_is_fatal() {
        let docker = Arc::new(MockDockerClient::new().with_live(vec![
            Ok(event(ContainerAction::Die, 5, "a")),
            Ok(event(ContainerAction::Start, 8, "a")),
        ]));
        let classifier = classifier(&docker);
        let transport = MockAlarmTransport::new().with_closed_from(0);
        let dispatcher =
            LiveDispatcher::new(docker.as_ref(), &classifier, &transport, Duration::ZERO);

        let mut watermark = Watermark::new(0);
        let err = dispatcher.run_subscription(&mut watermark).await.unwrap_err();

        assert!(matches!(err, AlarmMonitorError::ConnectionClosed(_)));
        assert!(err.is_fatal());
        // 두 번째 이벤트는 처리되지 않음
        assert_eq!(transport.calls(), 1);
        assert_eq!(watermark.get(), 6);
    }

    #[tokio::test]
    async fn source_error_ends_subscription() {
        let docker = Arc::new(MockDockerClient::new().with_live(vec![
            Ok(event(ContainerAction::Die, 5, "a")),
            Err(AlarmMonitorError::EventSource("socket reset".to_owned())),
            Ok(event(ContainerAction::Start, 9, "a")),
        ]));
        let classifier = classifier(&docker);
        let transport = MockAlarmTransport::new();
        let dispatcher =
            LiveDispatcher::new(docker.as_ref(), &classifier, &transport, Duration::ZERO);

        let mut watermark = Watermark::new(0);
        let end = dispatcher.run_subscription(&mut watermark).await.unwrap();

        assert!(matches!(end, SubscriptionEnd::SourceError(_)));
        assert_eq!(watermark.get(), 6);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_resubscribes_from_watermark_until_fatal() {
        let docker = Arc::new(
            MockDockerClient::new()
                .with_live(vec![
                    Ok(event(ContainerAction::Die, 5, "a")),
                    Err(AlarmMonitorError::EventSource("socket reset".to_owned())),
                ])
                .with_live(vec![Ok(event(ContainerAction::Start, 8, "a"))])
                .with_live(vec![Ok(event(ContainerAction::Stop, 12, "a"))]),
        );
        let classifier = classifier(&docker);
        let transport = MockAlarmTransport::new().with_closed_from(2);
        let dispatcher = LiveDispatcher::new(
            docker.as_ref(),
            &classifier,
            &transport,
            Duration::from_secs(1),
        );

        let mut watermark = Watermark::new(0);
        let err = dispatcher.run(&mut watermark).await.unwrap_err();

        assert!(matches!(err, AlarmMonitorError::ConnectionClosed(_)));
        assert_eq!(
            docker.windows(),
            vec![
                EventWindow::live(0),
                EventWindow::live(6),
                EventWindow::live(9),
            ]
        );
        assert_eq!(transport.sent().len(), 2);
        assert_eq!(watermark.get(), 13);
    }

    #[tokio::test]
    async fn forward_reports_delivery() {
        let transport = MockAlarmTransport::new().with_invalid_at(1);
        let alarm = AlarmRecord::from_event(
            &event(ContainerAction::Start, 1, "web"),
            "container went up",
            AlarmSeverity::Clear,
            "Unknown".to_owned(),
        );
        assert_eq!(
            forward(&transport, &alarm, m::PHASE_LIVE).await.unwrap(),
            Delivery::Sent
        );
        assert_eq!(
            forward(&transport, &alarm, m::PHASE_LIVE).await.unwrap(),
            Delivery::Discarded
        );
    }
}
