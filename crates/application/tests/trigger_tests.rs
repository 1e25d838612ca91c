mod common;

use common::{Harness, dimmer, relay};
use domain::output::{ManipulateRequest, OutputId, OutputType};
use domain::trigger::{DutyCycleCondition, OnOffCondition, TriggerCondition, TriggerRule};
use std::sync::atomic::Ordering;

fn on_off_rule(id: &str, output: &str, state: OnOffCondition, duration: f64) -> TriggerRule {
    TriggerRule::new(
        id,
        "Lights",
        OutputId::new(output).unwrap(),
        TriggerCondition::TriggerOutput {
            output_state: state,
            output_duration: duration,
        },
    )
}

fn pwm_rule(id: &str, output: &str, state: DutyCycleCondition, duty: f64) -> TriggerRule {
    TriggerRule::new(
        id,
        "Fan",
        OutputId::new(output).unwrap(),
        TriggerCondition::TriggerOutputPwm {
            output_state: state,
            output_duty_cycle: duty,
        },
    )
}

#[tokio::test]
async fn test_duration_greater_than_rule() {
    let mut h = Harness::ready(relay("relay-1")).await;
    h.add_rule(on_off_rule(
        "a1b2c3-rule",
        "relay-1",
        OnOffCondition::OnDurationGreaterThan,
        15.0,
    ));

    h.runtime
        .manipulate(ManipulateRequest::on().amount(20.0))
        .await;
    assert_eq!(h.dispatch_count(), 1);

    h.runtime.manipulate(ManipulateRequest::off()).await;
    h.runtime
        .manipulate(ManipulateRequest::on().amount(10.0))
        .await;
    assert_eq!(h.dispatch_count(), 1, "10s is not greater than 15s");
}

#[tokio::test]
async fn test_dispatch_message_format() {
    let mut h = Harness::ready(relay("relay-1")).await;
    h.add_rule(on_off_rule(
        "a1b2c3-rule",
        "relay-1",
        OnOffCondition::OnDurationGreaterThan,
        15.0,
    ));

    h.runtime
        .manipulate(ManipulateRequest::on().amount(20.0))
        .await;

    let dispatched = h.dispatcher.dispatched.lock().unwrap().clone();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].0, "a1b2c3-rule");
    assert_eq!(
        dispatched[0].1,
        "2024-05-01 12:00:00\n[Trigger a1b2c3 (Lights)] Output relay-1 (Relay) on_duration_greater_than"
    );
}

#[tokio::test]
async fn test_off_rule_only_fires_when_off() {
    let mut h = Harness::ready(relay("relay-1")).await;
    h.add_rule(on_off_rule("off-rule", "relay-1", OnOffCondition::Off, 0.0));

    h.runtime.manipulate(ManipulateRequest::on()).await;
    assert_eq!(h.dispatch_count(), 0);

    h.runtime.manipulate(ManipulateRequest::off()).await;
    assert_eq!(h.dispatch_count(), 1);
}

#[tokio::test]
async fn test_duration_none_and_any() {
    let mut h = Harness::ready(relay("relay-1")).await;
    h.add_rule(on_off_rule("none", "relay-1", OnOffCondition::OnDurationNone, 0.0));
    h.add_rule(on_off_rule("any", "relay-1", OnOffCondition::OnDurationAny, 0.0));
    h.add_rule(on_off_rule("both", "relay-1", OnOffCondition::OnDurationNoneAny, 0.0));

    h.runtime.manipulate(ManipulateRequest::on()).await;
    let ids: Vec<String> = h
        .dispatcher
        .dispatched
        .lock()
        .unwrap()
        .iter()
        .map(|(id, _)| id.clone())
        .collect();
    assert!(ids.contains(&"none".to_string()));
    assert!(ids.contains(&"both".to_string()));
    assert!(!ids.contains(&"any".to_string()));
}

#[tokio::test]
async fn test_rules_of_other_outputs_ignored() {
    let mut h = Harness::ready(relay("relay-1")).await;
    h.add_rule(on_off_rule("other", "relay-2", OnOffCondition::Off, 0.0));

    h.runtime.manipulate(ManipulateRequest::off()).await;
    assert_eq!(h.dispatch_count(), 0);
}

#[tokio::test]
async fn test_deactivated_rule_skipped() {
    let mut h = Harness::ready(relay("relay-1")).await;
    let mut rule = on_off_rule("off-rule", "relay-1", OnOffCondition::Off, 0.0);
    rule.is_activated = false;
    h.add_rule(rule);

    h.runtime.manipulate(ManipulateRequest::off()).await;
    assert_eq!(h.dispatch_count(), 0);
}

#[tokio::test]
async fn test_trigger_conditionals_disabled() {
    let mut h = Harness::ready(relay("relay-1")).await;
    h.add_rule(on_off_rule("off-rule", "relay-1", OnOffCondition::Off, 0.0));

    h.runtime
        .manipulate(ManipulateRequest::off().without_triggers())
        .await;
    assert_eq!(h.dispatch_count(), 0);
}

#[tokio::test]
async fn test_rejected_request_skips_triggers() {
    let mut h = Harness::ready(relay("relay-1")).await;
    h.add_rule(on_off_rule("none", "relay-1", OnOffCondition::OnDurationNone, 0.0));

    h.runtime.manipulate(ManipulateRequest::on()).await;
    let rejected = h.runtime.manipulate(ManipulateRequest::on()).await;

    assert_eq!(rejected.code(), 1);
    assert_eq!(h.dispatch_count(), 1);
}

#[tokio::test]
async fn test_pwm_rules() {
    let mut h = Harness::ready(dimmer("dimmer-1")).await;
    h.add_rule(pwm_rule("above", "dimmer-1", DutyCycleCondition::Above, 50.0));
    h.add_rule(pwm_rule("below", "dimmer-1", DutyCycleCondition::Below, 50.0));
    h.add_rule(pwm_rule("zero", "dimmer-1", DutyCycleCondition::Equal, 0.0));

    h.runtime
        .manipulate(ManipulateRequest::on().output_type(OutputType::Pwm).amount(60.0))
        .await;
    h.runtime
        .manipulate(ManipulateRequest::on().output_type(OutputType::Pwm).amount(40.0))
        .await;
    h.runtime
        .manipulate(ManipulateRequest::off().output_type(OutputType::Pwm))
        .await;

    let ids: Vec<String> = h
        .dispatcher
        .dispatched
        .lock()
        .unwrap()
        .iter()
        .map(|(id, _)| id.clone())
        .collect();
    // Off reads as "off": equal-0 and below-50 match, above never does.
    assert_eq!(ids, vec!["above", "below", "below", "zero"]);
}

#[tokio::test]
async fn test_pwm_message_names_duty_cycle() {
    let mut h = Harness::ready(dimmer("dimmer-1")).await;
    h.add_rule(pwm_rule("above", "dimmer-1", DutyCycleCondition::Above, 50.0));

    h.runtime
        .manipulate(ManipulateRequest::on().output_type(OutputType::Pwm).amount(75.0))
        .await;

    let dispatched = h.dispatcher.dispatched.lock().unwrap().clone();
    assert!(
        dispatched[0].1.ends_with("Output dimmer-1 (Dimmer) Duty Cycle 75 above 50"),
        "{}",
        dispatched[0].1
    );
}

#[tokio::test]
async fn test_dispatch_failure_not_surfaced() {
    let mut h = Harness::ready(relay("relay-1")).await;
    h.add_rule(on_off_rule("off-rule", "relay-1", OnOffCondition::Off, 0.0));
    h.dispatcher.fail.store(true, Ordering::SeqCst);

    let outcome = h.runtime.manipulate(ManipulateRequest::off()).await;

    assert!(outcome.is_accepted());
    assert_eq!(h.dispatch_count(), 1);
}

#[tokio::test]
async fn test_rule_store_failure_not_surfaced() {
    let mut h = Harness::ready(relay("relay-1")).await;
    h.rules.fail.store(true, Ordering::SeqCst);

    let outcome = h.runtime.manipulate(ManipulateRequest::on()).await;

    assert!(outcome.is_accepted());
    assert_eq!(h.dispatch_count(), 0);
}
