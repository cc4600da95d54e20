//! In-flight payments and their reconciliation.
//!
//! [`PaymentRegistry`] is the only owner of pending [`CardPayment`]s. A
//! payment enters through [`PaymentRegistry::submit`] and leaves the moment a
//! status check reports a terminal outcome. Leaving is an atomic take from the
//! map: whichever of the periodic sweep or an accelerated recheck takes the
//! entry resolves and notifies, the other finds nothing and stops.

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::Utc;
use indexmap::IndexMap;
use napthe_types::{CardPayment, ChargeResponse, ProviderReply, ReplyClass, StatusResponse, messages};
use parking_lot::{Mutex, RwLock};
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, error, info, warn};

use crate::{
    api::{CardInfo, PaymentApiClient, RequestKind},
    config::ReconcileConfig,
    error::{ApiError, Result},
    host::DonationHost,
    scheduler::{ScheduledTask, TaskScheduler},
    submission::ChargeRequest,
};

const LOG_TARGET: &str = "napthe::payment";

/// Timing knobs of the sweep and of accelerated rechecks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub interval: Duration,
    pub min_age: Duration,
    pub stale_after: Duration,
    pub recheck_interval: Duration,
    pub recheck_attempts: u32,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self::from(&ReconcileConfig::default())
    }
}

impl From<&ReconcileConfig> for ReconcilePolicy {
    fn from(config: &ReconcileConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval.max(1)),
            min_age: Duration::from_secs(config.min_age),
            stale_after: Duration::from_secs(config.stale_after),
            recheck_interval: Duration::from_secs(config.recheck_interval.max(1)),
            recheck_attempts: config.recheck_attempts,
        }
    }
}

struct PendingEntry {
    payment: CardPayment,
    submitted_at: Instant,
    recheck_armed: bool,
}

/// One eligible entry, copied out so no lock is held across a provider call.
struct SweepCandidate {
    request_id: String,
    card: CardInfo,
    stale: bool,
}

pub struct PaymentRegistry {
    api: Arc<PaymentApiClient>,
    host: Arc<dyn DonationHost>,
    scheduler: TaskScheduler,
    policy: ReconcilePolicy,
    pending: RwLock<IndexMap<String, PendingEntry>>,
    submitting: Mutex<HashSet<String>>,
}

/// Request id claimed by an in-flight `submit`, released on drop.
struct Reservation<'a> {
    submitting: &'a Mutex<HashSet<String>>,
    request_id: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.submitting.lock().remove(&self.request_id);
    }
}

impl PaymentRegistry {
    pub fn new(
        api: Arc<PaymentApiClient>,
        host: Arc<dyn DonationHost>,
        scheduler: TaskScheduler,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            api,
            host,
            scheduler,
            policy,
            pending: RwLock::new(IndexMap::new()),
            submitting: Mutex::new(HashSet::new()),
        }
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    /// Arm the periodic sweep on the scheduler.
    pub fn start_periodic_sweep(&self) -> JoinHandle<()> {
        info!(target: LOG_TARGET, interval_secs = self.policy.interval.as_secs(), "Starting payment sweep");
        self.scheduler
            .schedule_every(self.policy.interval, ScheduledTask::Sweep)
    }

    /// Charge the card and track it when the provider accepted it for processing.
    pub async fn submit(&self, request: ChargeRequest) -> Result<ChargeResponse> {
        let _reservation = self.reserve(&request.request_id)?;

        let response = self
            .api
            .charge_card(
                request.telco,
                &request.code,
                &request.serial,
                request.amount,
                &request.request_id,
            )
            .await?;

        match response.classify() {
            ReplyClass::Successful | ReplyClass::Pending => {
                let payment = CardPayment::new(
                    request.request_id.clone(),
                    request.player_name.clone(),
                    request.telco,
                    request.code,
                    request.serial,
                    request.amount,
                    Utc::now(),
                );
                self.pending.write().insert(
                    request.request_id.clone(),
                    PendingEntry {
                        payment,
                        submitted_at: Instant::now(),
                        recheck_armed: false,
                    },
                );
                info!(
                    target: LOG_TARGET,
                    player = %request.player_name,
                    request_id = %request.request_id,
                    telco = %request.telco,
                    amount = request.amount,
                    "Payment initiated"
                );
            }
            ReplyClass::Unreachable => {
                warn!(target: LOG_TARGET, player = %request.player_name, request_id = %request.request_id, "Provider unreachable, payment not registered");
            }
            ReplyClass::Throttled | ReplyClass::Failed => {
                info!(
                    target: LOG_TARGET,
                    player = %request.player_name,
                    request_id = %request.request_id,
                    status = %response.status,
                    message = %response.message,
                    "Charge rejected"
                );
            }
        }

        Ok(response)
    }

    /// Claim `request_id` for one submission. Fails while it is pending or
    /// another submission with the same id is in flight.
    fn reserve(&self, request_id: &str) -> Result<Reservation<'_>> {
        let pending = self.pending.read();
        let mut submitting = self.submitting.lock();
        if pending.contains_key(request_id) || !submitting.insert(request_id.to_string()) {
            return Err(ApiError::DuplicateRequest(request_id.to_string()));
        }
        Ok(Reservation {
            submitting: &self.submitting,
            request_id: request_id.to_string(),
        })
    }

    /// Check every pending payment old enough to be worth a provider call.
    /// Returns the payments resolved by this pass.
    pub async fn reconcile_pending(&self) -> Vec<CardPayment> {
        let candidates = self.sweep_candidates();
        debug!(target: LOG_TARGET, pending = self.pending_count(), eligible = candidates.len(), "Sweeping pending payments");

        let mut resolved = Vec::new();
        for candidate in candidates {
            let response = match self.check_candidate(&candidate).await {
                Ok(response) => response,
                Err(e) => {
                    error!(target: LOG_TARGET, error = %e, "Sweep aborted");
                    break;
                }
            };

            match response.classify() {
                ReplyClass::Unreachable => {
                    debug!(target: LOG_TARGET, request_id = %candidate.request_id, "Status unknown, retrying next sweep");
                }
                ReplyClass::Throttled => {
                    debug!(target: LOG_TARGET, request_id = %candidate.request_id, "Provider still throttling, ending sweep early");
                    break;
                }
                ReplyClass::Pending => {
                    if candidate.stale {
                        self.schedule_accelerated_recheck(
                            &candidate.request_id,
                            self.policy.recheck_interval,
                            self.policy.recheck_attempts,
                        );
                    }
                }
                ReplyClass::Successful | ReplyClass::Failed => {
                    if let Some(payment) = self.resolve(&candidate.request_id, &response) {
                        resolved.push(payment);
                    }
                }
            }
        }
        resolved
    }

    /// Check one candidate once the shared check cooldown allows it. A throttled
    /// reply is retried once after waiting again.
    async fn check_candidate(&self, candidate: &SweepCandidate) -> Result<StatusResponse> {
        let mut retried = false;
        loop {
            self.api.wait_for_slot(RequestKind::Check).await;
            let response = self
                .api
                .check_status(&candidate.request_id, Some(&candidate.card))
                .await?;
            if response.classify() != ReplyClass::Throttled || retried {
                return Ok(response);
            }
            retried = true;
        }
    }

    fn sweep_candidates(&self) -> Vec<SweepCandidate> {
        let now = Instant::now();
        self.pending
            .read()
            .iter()
            .filter_map(|(request_id, entry)| {
                let age = now.saturating_duration_since(entry.submitted_at);
                if age < self.policy.min_age {
                    return None;
                }
                Some(SweepCandidate {
                    request_id: request_id.clone(),
                    card: CardInfo::from(&entry.payment),
                    stale: age > self.policy.stale_after,
                })
            })
            .collect()
    }

    /// Arm a chain of up to `max_attempts` one-shot checks spaced by `interval`.
    /// Each payment gets at most one chain; returns whether a chain was armed.
    pub fn schedule_accelerated_recheck(
        &self,
        request_id: &str,
        interval: Duration,
        max_attempts: u32,
    ) -> bool {
        if max_attempts == 0 {
            return false;
        }
        {
            let mut pending = self.pending.write();
            let Some(entry) = pending.get_mut(request_id) else {
                return false;
            };
            if entry.recheck_armed {
                return false;
            }
            entry.recheck_armed = true;
        }

        info!(
            target: LOG_TARGET,
            request_id = %request_id,
            interval_secs = interval.as_secs(),
            max_attempts,
            "Scheduling accelerated recheck"
        );
        self.scheduler.schedule_once(
            interval,
            ScheduledTask::Recheck {
                request_id: request_id.to_string(),
                interval,
                attempts_left: max_attempts,
            },
        );
        true
    }

    /// One link of an accelerated recheck chain.
    pub async fn run_accelerated_recheck(
        &self,
        request_id: &str,
        interval: Duration,
        attempts_left: u32,
    ) -> Option<CardPayment> {
        let card = match self.pending.read().get(request_id) {
            Some(entry) => CardInfo::from(&entry.payment),
            None => {
                debug!(target: LOG_TARGET, request_id = %request_id, "Already resolved, stopping recheck");
                return None;
            }
        };

        let response = match self.api.check_status(request_id, Some(&card)).await {
            Ok(response) => response,
            Err(e) => {
                error!(target: LOG_TARGET, request_id = %request_id, error = %e, "Recheck aborted");
                return None;
            }
        };

        match response.classify() {
            ReplyClass::Successful | ReplyClass::Failed => self.resolve(request_id, &response),
            _ => {
                let remaining = attempts_left.saturating_sub(1);
                if remaining > 0 {
                    debug!(target: LOG_TARGET, request_id = %request_id, remaining, "Still pending, rechecking later");
                    self.scheduler.schedule_once(
                        interval,
                        ScheduledTask::Recheck {
                            request_id: request_id.to_string(),
                            interval,
                            attempts_left: remaining,
                        },
                    );
                } else {
                    debug!(target: LOG_TARGET, request_id = %request_id, "Recheck attempts exhausted, leaving to sweep");
                }
                None
            }
        }
    }

    /// Take the entry and apply a terminal reply. `None` when someone else got there first.
    fn resolve(&self, request_id: &str, response: &StatusResponse) -> Option<CardPayment> {
        let entry = self.pending.write().shift_remove(request_id)?;
        let mut payment = entry.payment;

        if response.is_successful() {
            let amount = response.amount.unwrap_or(payment.declared_amount());
            if let Err(e) = payment.mark_successful(amount) {
                warn!(target: LOG_TARGET, error = %e, "Ignoring duplicate resolution");
                return None;
            }
            info!(
                target: LOG_TARGET,
                player = %payment.player_name(),
                request_id = %request_id,
                amount,
                "Payment successful"
            );
            self.host
                .notify_successful_donation(payment.player_name(), amount);
        } else {
            if let Err(e) = payment.mark_failed(response.message.clone()) {
                warn!(target: LOG_TARGET, error = %e, "Ignoring duplicate resolution");
                return None;
            }
            info!(
                target: LOG_TARGET,
                player = %payment.player_name(),
                request_id = %request_id,
                reason = %response.message,
                "Payment failed"
            );
            self.host.notify_player_message(
                payment.player_name(),
                &messages::card_rejected_message(&response.message),
            );
        }

        Some(payment)
    }

    pub fn get_payment(&self, request_id: &str) -> Option<CardPayment> {
        self.pending
            .read()
            .get(request_id)
            .map(|entry| entry.payment.clone())
    }

    /// Snapshot of pending payments in submission order.
    pub fn list_pending(&self) -> Vec<CardPayment> {
        self.pending
            .read()
            .values()
            .map(|entry| entry.payment.clone())
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.read().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.read().len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use napthe_types::Telco;
    use parking_lot::Mutex;
    use serde_json::Value;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        api::{ProviderTransport, RequestThrottle, TransportError},
        config::NapTheConfig,
    };

    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<std::result::Result<String, TransportError>>>,
        sent: Mutex<Vec<Value>>,
        latency: Duration,
    }

    impl ScriptedTransport {
        fn push(&self, body: &str) {
            self.replies.lock().push_back(Ok(body.to_string()));
        }

        fn sent_commands(&self) -> Vec<String> {
            self.sent
                .lock()
                .iter()
                .map(|p| p["command"].as_str().unwrap_or_default().to_string())
                .collect()
        }

        fn checked_ids(&self) -> Vec<String> {
            self.sent
                .lock()
                .iter()
                .filter(|p| p["command"] == "check")
                .map(|p| p["request_id"].as_str().unwrap_or_default().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl ProviderTransport for ScriptedTransport {
        async fn post_json(&self, payload: &Value) -> std::result::Result<String, TransportError> {
            self.sent.lock().push(payload.clone());
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.replies
                .lock()
                .pop_front()
                .unwrap_or(Err(TransportError::Timeout(Duration::from_secs(10))))
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        donations: Mutex<Vec<(String, i64)>>,
        messages: Mutex<Vec<(String, String)>>,
    }

    impl DonationHost for RecordingHost {
        fn notify_successful_donation(&self, player_name: &str, amount: i64) {
            self.donations.lock().push((player_name.to_string(), amount));
        }

        fn notify_player_message(&self, player_name: &str, text: &str) {
            self.messages
                .lock()
                .push((player_name.to_string(), text.to_string()));
        }
    }

    struct Fixture {
        registry: PaymentRegistry,
        transport: Arc<ScriptedTransport>,
        host: Arc<RecordingHost>,
        rx: mpsc::UnboundedReceiver<ScheduledTask>,
    }

    fn fixture() -> Fixture {
        fixture_with(
            ScriptedTransport::default(),
            RequestThrottle::new(Duration::ZERO, Duration::ZERO),
        )
    }

    fn fixture_with(transport: ScriptedTransport, throttle: RequestThrottle) -> Fixture {
        let config = NapTheConfig {
            partner_id: "1".into(),
            partner_key: "k".into(),
            ..Default::default()
        };
        let transport = Arc::new(transport);
        let api = PaymentApiClient::new(&config, transport.clone()).with_throttle(throttle);
        let host = Arc::new(RecordingHost::default());
        let (scheduler, rx) = TaskScheduler::channel();
        let registry = PaymentRegistry::new(
            Arc::new(api),
            host.clone(),
            scheduler,
            ReconcilePolicy::default(),
        );
        Fixture {
            registry,
            transport,
            host,
            rx,
        }
    }

    fn request(id: &str) -> ChargeRequest {
        ChargeRequest::new("Steve", Telco::Viettel, "312821445892982", "10004783347874", 50_000)
            .with_request_id(id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_charge_is_registered() {
        let f = fixture();
        f.transport.push(r#"{"status":99,"message":"PENDING"}"#);

        let response = f.registry.submit(request("r1")).await.unwrap();

        assert!(response.is_pending());
        assert!(f.registry.has_pending());
        let payment = f.registry.get_payment("r1").unwrap();
        assert!(payment.is_pending());
        assert_eq!(payment.declared_amount(), 50_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_and_unreachable_charges_are_not_registered() {
        let f = fixture();
        f.transport.push(r#"{"status":99,"message":"card_existed"}"#);
        let rejected = f.registry.submit(request("r1")).await.unwrap();
        assert_eq!(rejected.classify(), ReplyClass::Failed);

        let unreachable = f.registry.submit(request("r2")).await.unwrap();
        assert!(!unreachable.is_valid_request());

        assert!(!f.registry.has_pending());
        assert!(f.host.messages.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_request_id_is_refused() {
        let f = fixture();
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        f.registry.submit(request("r1")).await.unwrap();

        let err = f.registry.submit(request("r1")).await.unwrap_err();
        assert!(matches!(err, ApiError::DuplicateRequest(id) if id == "r1"));
        assert_eq!(f.transport.sent.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submits_with_same_id_reach_provider_once() {
        let f = fixture_with(
            ScriptedTransport {
                latency: Duration::from_millis(200),
                ..Default::default()
            },
            RequestThrottle::new(Duration::ZERO, Duration::ZERO),
        );
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);

        let (first, second) = tokio::join!(
            f.registry.submit(request("r1")),
            f.registry.submit(request("r1"))
        );

        assert!(first.unwrap().is_pending());
        assert!(matches!(second, Err(ApiError::DuplicateRequest(id)) if id == "r1"));
        assert_eq!(f.transport.sent.lock().len(), 1);
        assert_eq!(f.registry.pending_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_request_id_can_be_resubmitted() {
        let f = fixture();
        f.transport.push(r#"{"status":99,"message":"card_existed"}"#);
        f.registry.submit(request("r1")).await.unwrap();

        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        let retry = f.registry.submit(request("r1")).await.unwrap();

        assert!(retry.is_pending());
        assert_eq!(f.transport.sent.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_spaces_checks_by_the_check_cooldown() {
        let f = fixture_with(
            ScriptedTransport::default(),
            RequestThrottle::from_config(&Default::default()),
        );
        for id in ["a", "b", "c"] {
            f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
            f.registry.submit(request(id)).await.unwrap();
            tokio::time::advance(Duration::from_secs(2)).await;
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        f.transport.push(r#"{"status":1,"message":"OK","amount":50000}"#);

        let started = Instant::now();
        let resolved = f.registry.reconcile_pending().await;

        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(f.transport.checked_ids(), vec!["a", "b", "c"]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].request_id(), "c");
        assert_eq!(f.registry.pending_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_throttle_is_retried_once_then_ends_sweep() {
        let f = fixture();
        for id in ["a", "b"] {
            f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
            f.registry.submit(request(id)).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(30)).await;

        f.transport.push(r#"{"status":99,"message":"charging.too_many_requests"}"#);
        f.transport.push(r#"{"status":1,"message":"OK","amount":50000}"#);
        f.transport.push(r#"{"status":99,"message":"charging.too_many_requests"}"#);
        f.transport.push(r#"{"status":99,"message":"charging.too_many_requests"}"#);
        let resolved = f.registry.reconcile_pending().await;

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].request_id(), "a");
        assert_eq!(f.transport.checked_ids(), vec!["a", "a", "b", "b"]);
        assert!(f.registry.get_payment("b").unwrap().is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_respects_age_floor() {
        let f = fixture();
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        f.registry.submit(request("r1")).await.unwrap();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(f.registry.reconcile_pending().await.is_empty());
        assert_eq!(f.transport.sent_commands(), vec!["charging"]);

        tokio::time::advance(Duration::from_secs(1)).await;
        f.transport.push(r#"{"status":1,"message":"OK","amount":50000}"#);
        let resolved = f.registry.reconcile_pending().await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(f.transport.sent_commands(), vec!["charging", "check"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_credits_provider_amount() {
        let f = fixture();
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        f.registry.submit(request("r1")).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        f.transport.push(r#"{"status":1,"message":"OK","amount":"20000"}"#);
        let resolved = f.registry.reconcile_pending().await;

        assert!(resolved[0].is_successful());
        assert_eq!(resolved[0].processed_amount(), Some(20_000));
        assert_eq!(*f.host.donations.lock(), vec![("Steve".to_string(), 20_000)]);
        assert!(f.registry.get_payment("r1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_without_amount_credits_declared_value() {
        let f = fixture();
        f.transport.push(r#"{"status":1,"message":"OK"}"#);
        f.registry.submit(request("r1")).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        f.transport.push(r#"{"status":1,"message":"OK"}"#);
        f.registry.reconcile_pending().await;
        assert_eq!(*f.host.donations.lock(), vec![("Steve".to_string(), 50_000)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_messages_player_with_translation() {
        let f = fixture();
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        f.registry.submit(request("r1")).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        f.transport.push(r#"{"status":4,"message":"charging.card.wrong"}"#);
        let resolved = f.registry.reconcile_pending().await;

        assert!(resolved[0].is_failed());
        assert_eq!(resolved[0].fail_reason(), Some("charging.card.wrong"));
        let messages = f.host.messages.lock();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("Mã thẻ hoặc số serial không đúng"));
        assert!(f.host.donations.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_and_throttled_checks_leave_entry() {
        let f = fixture();
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        f.registry.submit(request("r1")).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert!(f.registry.reconcile_pending().await.is_empty());
        f.transport.push(r#"{"status":99,"message":"charging.too_many_requests"}"#);
        assert!(f.registry.reconcile_pending().await.is_empty());

        assert!(f.registry.get_payment("r1").unwrap().is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_pending_arms_one_recheck_chain() {
        let mut f = fixture();
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        f.registry.submit(request("r1")).await.unwrap();
        tokio::time::advance(Duration::from_secs(65)).await;

        f.transport.push(r#"{"status":99,"message":"pending"}"#);
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        f.registry.reconcile_pending().await;
        f.registry.reconcile_pending().await;

        let task = f.rx.recv().await.unwrap();
        assert_eq!(
            task,
            ScheduledTask::Recheck {
                request_id: "r1".into(),
                interval: Duration::from_secs(5),
                attempts_left: 12,
            }
        );
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(f.rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recheck_chain_counts_down_and_stops() {
        let mut f = fixture();
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        f.registry.submit(request("r1")).await.unwrap();

        assert!(f.registry.schedule_accelerated_recheck("r1", Duration::from_secs(5), 2));
        assert!(!f.registry.schedule_accelerated_recheck("r1", Duration::from_secs(5), 2));

        let Some(ScheduledTask::Recheck { request_id, interval, attempts_left }) = f.rx.recv().await
        else {
            panic!("expected recheck");
        };
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        assert!(f.registry.run_accelerated_recheck(&request_id, interval, attempts_left).await.is_none());

        let next = f.rx.recv().await.unwrap();
        assert_eq!(
            next,
            ScheduledTask::Recheck {
                request_id: "r1".into(),
                interval: Duration::from_secs(5),
                attempts_left: 1,
            }
        );
        f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
        assert!(f.registry.run_accelerated_recheck("r1", interval, 1).await.is_none());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(f.rx.try_recv().is_err());
        assert!(f.registry.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recheck_of_resolved_payment_is_a_no_op() {
        let f = fixture();
        assert!(f.registry.run_accelerated_recheck("gone", Duration::from_secs(5), 3).await.is_none());
        assert!(!f.registry.schedule_accelerated_recheck("gone", Duration::from_secs(5), 3));
        assert!(f.transport.sent.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_pending_keeps_submission_order() {
        let f = fixture();
        for id in ["a", "b", "c"] {
            f.transport.push(r#"{"status":2,"message":"PENDING"}"#);
            f.registry.submit(request(id)).await.unwrap();
        }
        let ids: Vec<String> = f
            .registry
            .list_pending()
            .iter()
            .map(|p| p.request_id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(f.registry.pending_count(), 3);
    }
}
