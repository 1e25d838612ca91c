pub mod dispatcher;
pub mod evaluator;

pub use dispatcher::LoggingActionDispatcher;
pub use evaluator::TriggerEvaluator;
