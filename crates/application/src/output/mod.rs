pub mod manager;
pub mod runtime;

pub use manager::OutputManager;
pub use runtime::OutputRuntime;
