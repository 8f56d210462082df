pub mod relay_dto;
pub mod outcome_dto;
