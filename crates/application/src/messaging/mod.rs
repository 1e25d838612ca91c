pub mod command_listener;
