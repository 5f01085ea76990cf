//! ScriptedTransport - in-process transport replaying queued outcomes
//!
//! Each push pops the next scripted outcome; once the script runs dry the
//! fallback outcome repeats. Every pushed record is kept for inspection.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{AttemptOutcome, HealthReport, RecordTransport, SourceRecord};

#[derive(Debug)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<AttemptOutcome>>,
    fallback: AttemptOutcome,
    pushed: Mutex<Vec<SourceRecord>>,
    health: HealthReport,
}

impl ScriptedTransport {
    /// Transport answering every push with `outcome`
    pub fn always(outcome: AttemptOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: outcome,
            pushed: Mutex::new(Vec::new()),
            health: HealthReport {
                reachable: true,
                status: Some(200),
                ..Default::default()
            },
        }
    }

    /// Always HTTP 200
    pub fn accepting() -> Self {
        Self::always(AttemptOutcome::Delivered { message: None })
    }

    /// Always HTTP 503
    pub fn unavailable() -> Self {
        Self::always(AttemptOutcome::Rejected {
            status: 503,
            body: "Service Unavailable".to_string(),
        })
    }

    /// Queue `outcome` ahead of the fallback
    pub fn then(self, outcome: AttemptOutcome) -> Self {
        lock(&self.script).push_back(outcome);
        self
    }

    pub fn with_health(mut self, report: HealthReport) -> Self {
        self.health = report;
        self
    }

    /// Records pushed so far, in push order
    pub fn pushed(&self) -> Vec<SourceRecord> {
        lock(&self.pushed).clone()
    }

    pub fn push_count(&self) -> usize {
        lock(&self.pushed).len()
    }
}

impl RecordTransport for ScriptedTransport {
    fn endpoint(&self) -> &str {
        "scripted://"
    }

    async fn push(&self, record: &SourceRecord) -> AttemptOutcome {
        lock(&self.pushed).push(record.clone());
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn health(&self) -> HealthReport {
        self.health.clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
