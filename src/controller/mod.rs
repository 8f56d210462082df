pub mod relay_bank;
pub mod factory;
