use domain::clock::Clock;
use domain::output::{Output, OutputState};
use domain::trigger::{
    ActionDispatcher, TriggerClass, TriggerCondition, TriggerRule, TriggerRuleRepository,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Matches persisted output rules against a just-completed transition and
/// hands every match to the action dispatcher.
pub struct TriggerEvaluator {
    rules: Arc<dyn TriggerRuleRepository>,
    dispatcher: Arc<dyn ActionDispatcher>,
    clock: Arc<dyn Clock>,
}

impl TriggerEvaluator {
    pub fn new(
        rules: Arc<dyn TriggerRuleRepository>,
        dispatcher: Arc<dyn ActionDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rules,
            dispatcher,
            clock,
        }
    }

    /// Evaluate both rule classes for `output`. `live` is the driver's state
    /// after the transition and `amount` the amount that was requested.
    ///
    /// Returns the number of rules dispatched.
    pub async fn check_triggers(&self, output: &Output, live: OutputState, amount: f64) -> usize {
        let mut fired = 0;

        for rule in self.load(output, TriggerClass::Output).await {
            if let TriggerCondition::TriggerOutput {
                output_state,
                output_duration,
            } = rule.condition
            {
                let matched = output_state.eligible(live.is_on())
                    && output_state.criterion(output_duration).matches(amount);
                if matched {
                    let message = format!(
                        "{}\n[Trigger {} ({})] Output {} ({}) {}",
                        self.timestamp(),
                        rule.short_id(),
                        rule.name,
                        output.id,
                        output.name,
                        output_state.as_str()
                    );
                    fired += self.dispatch(&rule, &message).await;
                }
            }
        }

        let duty_cycle = live.duty_cycle();
        for rule in self.load(output, TriggerClass::OutputPwm).await {
            if let TriggerCondition::TriggerOutputPwm {
                output_state,
                output_duty_cycle,
            } = rule.condition
            {
                if output_state.matches(duty_cycle, output_duty_cycle) {
                    let message = format!(
                        "{}\n[Trigger {} ({})] Output {} ({}) Duty Cycle {} {} {}",
                        self.timestamp(),
                        rule.short_id(),
                        rule.name,
                        output.id,
                        output.name,
                        duty_cycle,
                        output_state.as_str(),
                        output_duty_cycle
                    );
                    fired += self.dispatch(&rule, &message).await;
                }
            }
        }

        debug!(output_id = %output.id, fired, "Triggers evaluated");
        fired
    }

    async fn load(&self, output: &Output, class: TriggerClass) -> Vec<TriggerRule> {
        match self.rules.find_active(&output.id, class).await {
            Ok(rules) => rules.into_iter().filter(|r| r.is_activated).collect(),
            Err(e) => {
                error!(
                    output_id = %output.id,
                    class = class.as_str(),
                    error = %e,
                    "Failed to load trigger rules"
                );
                Vec::new()
            }
        }
    }

    async fn dispatch(&self, rule: &TriggerRule, message: &str) -> usize {
        info!(rule_id = %rule.id, rule = %rule.name, "🔥 Trigger matched");
        match self.dispatcher.dispatch(&rule.id, message).await {
            Ok(()) => 1,
            Err(e) => {
                warn!(rule_id = %rule.id, error = %e, "Failed to dispatch trigger actions");
                0
            }
        }
    }

    fn timestamp(&self) -> String {
        self.clock.now().format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
