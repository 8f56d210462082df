pub mod clock;
pub mod rule;
pub mod print_window;
pub mod engine;
