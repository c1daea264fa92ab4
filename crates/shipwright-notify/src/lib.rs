use std::time::Duration;

use rand::Rng;

use shipwright_core::config::NotifySettings;
use shipwright_core::NotificationPayload;

// ── Policy ──

/// Retry schedule for evaluator callbacks.
///
/// The delay after failed attempt `n` (0-based) is `base * multiplier^n`,
/// optionally scaled by a random factor in `[0.5, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub multiplier: u32,
    pub max_attempts: u32,
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            multiplier: 2,
            max_attempts: 5,
            jitter: false,
        }
    }
}

impl From<&NotifySettings> for BackoffPolicy {
    fn from(s: &NotifySettings) -> Self {
        Self {
            base: Duration::from_secs(s.base_secs),
            multiplier: s.multiplier,
            max_attempts: s.attempts,
            jitter: s.jitter,
        }
    }
}

impl BackoffPolicy {
    /// Unjittered delay following failed attempt `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.base.saturating_mul(factor)
    }

    /// Full unjittered schedule, one entry per attempt.
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts).map(|n| self.delay(n)).collect()
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let delay = self.delay(attempt);
        if self.jitter {
            let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
            Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(delay)
        } else {
            delay
        }
    }
}

// ── Transport ──

/// Posts a JSON body and reports the HTTP status.
pub trait Sender: Send + Sync {
    fn post_json(&self, url: &str, body: &serde_json::Value) -> anyhow::Result<u16>;
}

const TIMEOUT: Duration = Duration::from_secs(10);

pub struct UreqSender {
    agent: ureq::Agent,
}

impl UreqSender {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(TIMEOUT))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqSender {
    fn default() -> Self {
        Self::new()
    }
}

impl Sender for UreqSender {
    fn post_json(&self, url: &str, body: &serde_json::Value) -> anyhow::Result<u16> {
        let resp = self
            .agent
            .post(url)
            .header("Content-Type", "application/json")
            .send(body.to_string())?;
        Ok(resp.status().as_u16())
    }
}

// ── Notifier ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered { attempts: u32 },
    Exhausted { attempts: u32 },
}

type SleepFn = Box<dyn Fn(Duration) + Send + Sync>;

/// Delivers deployment results to the evaluator. Blocks the calling thread
/// while backing off.
pub struct EvaluatorNotifier {
    policy: BackoffPolicy,
    sender: Box<dyn Sender>,
    sleep: SleepFn,
}

impl EvaluatorNotifier {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self::with_transport(policy, Box::new(UreqSender::new()), Box::new(std::thread::sleep))
    }

    pub fn with_transport(policy: BackoffPolicy, sender: Box<dyn Sender>, sleep: SleepFn) -> Self {
        Self {
            policy,
            sender,
            sleep,
        }
    }

    /// POST `payload` to `url` until it answers 200 or the policy runs out.
    /// Failure is logged, never returned.
    pub fn notify(&self, payload: &NotificationPayload, url: &str) -> NotifyOutcome {
        let body = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "could not encode evaluator payload");
                return NotifyOutcome::Exhausted { attempts: 0 };
            }
        };

        for attempt in 0..self.policy.max_attempts {
            let delay = self.policy.jittered(attempt);
            match self.sender.post_json(url, &body) {
                Ok(200) => {
                    tracing::info!(url, attempt = attempt + 1, "evaluator notified");
                    return NotifyOutcome::Delivered {
                        attempts: attempt + 1,
                    };
                }
                Ok(status) => tracing::warn!(
                    url,
                    attempt = attempt + 1,
                    status,
                    delay_ms = delay.as_millis() as u64,
                    "evaluator rejected notification, retrying"
                ),
                Err(e) => tracing::warn!(
                    url,
                    attempt = attempt + 1,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "evaluator unreachable, retrying"
                ),
            }
            (self.sleep)(delay);
        }

        tracing::error!(
            url,
            attempts = self.policy.max_attempts,
            task = %payload.task,
            round = payload.round,
            "giving up on evaluator notification"
        );
        NotifyOutcome::Exhausted {
            attempts: self.policy.max_attempts,
        }
    }
}
