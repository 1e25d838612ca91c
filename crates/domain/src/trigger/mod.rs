mod dispatcher;
mod operator;
mod repository;
mod rule;

pub use dispatcher::ActionDispatcher;
pub use operator::Operator;
pub use repository::TriggerRuleRepository;
pub use rule::{
    Criterion, DutyCycleCondition, OnOffCondition, TriggerClass, TriggerCondition, TriggerRule,
};
