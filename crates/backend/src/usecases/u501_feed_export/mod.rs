pub mod gateway;
pub mod mappers;
pub mod writers;
