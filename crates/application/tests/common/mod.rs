#![allow(dead_code)]

use application::{DurationRecorder, OutputRuntime, RecorderWorkers, TriggerEvaluator};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::clock::{Clock, ManualClock};
use domain::driver::OutputDriver;
use domain::measurement::{MeasurementSample, MeasurementStore};
use domain::output::{Capability, Output, OutputId, OutputState, OutputType, SwitchState};
use domain::trigger::{ActionDispatcher, TriggerClass, TriggerRule, TriggerRuleRepository};
use domain::DomainError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub type SwitchCall = (SwitchState, OutputType, Option<f64>);

/// Driver double that records every switch call and tracks a live state
pub struct FakeDriver {
    pub calls: Arc<Mutex<Vec<SwitchCall>>>,
    pub fail: Arc<AtomicBool>,
    pub locks_released: Arc<AtomicBool>,
    state: OutputState,
    setup: bool,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(AtomicBool::new(false)),
            locks_released: Arc::new(AtomicBool::new(false)),
            state: OutputState::Off,
            setup: false,
        }
    }
}

#[async_trait]
impl OutputDriver for FakeDriver {
    async fn setup(&mut self) -> Result<(), DomainError> {
        self.setup = true;
        Ok(())
    }

    async fn switch(
        &mut self,
        state: SwitchState,
        output_type: OutputType,
        amount: Option<f64>,
    ) -> Result<(), DomainError> {
        self.calls.lock().unwrap().push((state, output_type, amount));
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Driver("relay not responding".to_string()));
        }

        self.state = match (state, output_type) {
            (SwitchState::Off, _) => OutputState::Off,
            (SwitchState::On, OutputType::Pwm) => OutputState::DutyCycle(amount.unwrap_or(0.0)),
            (SwitchState::On, OutputType::Vol) => OutputState::Off,
            (SwitchState::On, OutputType::Sec) => OutputState::On,
        };
        Ok(())
    }

    fn is_on(&self) -> OutputState {
        self.state
    }

    fn is_setup(&self) -> bool {
        self.setup
    }

    async fn release_locks(&mut self) -> Result<(), DomainError> {
        self.locks_released.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn driver_type(&self) -> &str {
        "fake"
    }
}

/// Measurement store that keeps samples in memory
#[derive(Default)]
pub struct MemoryStore {
    pub samples: Mutex<Vec<MeasurementSample>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl MeasurementStore for MemoryStore {
    async fn write_sample(&self, sample: &MeasurementSample) -> Result<(), DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Metrics("database is locked".to_string()));
        }
        self.samples.lock().unwrap().push(sample.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRules {
    pub rules: Mutex<Vec<TriggerRule>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl TriggerRuleRepository for MemoryRules {
    async fn find_active(
        &self,
        output_id: &OutputId,
        class: TriggerClass,
    ) -> Result<Vec<TriggerRule>, DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Repository("no such table: trigger_rules".to_string()));
        }
        Ok(self
            .rules
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.output_id == output_id && r.class() == class)
            .cloned()
            .collect())
    }

    async fn save(&self, rule: &TriggerRule) -> Result<(), DomainError> {
        let mut rules = self.rules.lock().unwrap();
        rules.retain(|r| r.id != rule.id);
        rules.push(rule.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDispatcher {
    pub dispatched: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl ActionDispatcher for RecordingDispatcher {
    async fn dispatch(&self, rule_id: &str, message: &str) -> Result<(), DomainError> {
        self.dispatched
            .lock()
            .unwrap()
            .push((rule_id.to_string(), message.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Dispatch("broker unreachable".to_string()));
        }
        Ok(())
    }
}

/// A runtime wired to in-memory collaborators
pub struct Harness {
    pub runtime: OutputRuntime,
    pub calls: Arc<Mutex<Vec<SwitchCall>>>,
    pub driver_fail: Arc<AtomicBool>,
    pub locks_released: Arc<AtomicBool>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub rules: Arc<MemoryRules>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub workers: Option<RecorderWorkers>,
}

impl Harness {
    pub fn new(output: Output) -> Self {
        let driver = FakeDriver::new();
        let calls = driver.calls.clone();
        let driver_fail = driver.fail.clone();
        let locks_released = driver.locks_released.clone();

        let clock = Arc::new(ManualClock::new(t0()));
        let store = Arc::new(MemoryStore::default());
        let rules = Arc::new(MemoryRules::default());
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let (recorder, workers) = DurationRecorder::start(store.clone(), 64, 1);
        let evaluator = Arc::new(TriggerEvaluator::new(
            rules.clone(),
            dispatcher.clone(),
            clock.clone(),
        ));

        let runtime = OutputRuntime::new(
            output,
            Box::new(driver),
            recorder,
            evaluator,
            clock.clone() as Arc<dyn Clock>,
        );

        Self {
            runtime,
            calls,
            driver_fail,
            locks_released,
            clock,
            store,
            rules,
            dispatcher,
            workers: Some(workers),
        }
    }

    pub async fn ready(output: Output) -> Self {
        let mut harness = Self::new(output);
        harness.runtime.setup().await.unwrap();
        harness
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatcher.dispatched.lock().unwrap().len()
    }

    pub fn add_rule(&self, rule: TriggerRule) {
        self.rules.rules.lock().unwrap().push(rule);
    }

    /// Drain the recorder and return everything persisted so far
    pub async fn flush_samples(&mut self) -> Vec<MeasurementSample> {
        if let Some(workers) = self.workers.take() {
            workers.shutdown().await;
        }
        self.store.samples.lock().unwrap().clone()
    }
}

pub fn relay(id: &str) -> Output {
    Output::new(OutputId::new(id).unwrap(), "Relay", vec![Capability::OnOff])
}

pub fn dimmer(id: &str) -> Output {
    Output::new(
        OutputId::new(id).unwrap(),
        "Dimmer",
        vec![Capability::OnOff, Capability::Pwm],
    )
}

pub fn pump(id: &str) -> Output {
    Output::new(OutputId::new(id).unwrap(), "Pump", vec![Capability::Volume])
}
