mod output_driver;

pub use output_driver::OutputDriver;
