pub mod adapters;
pub mod creator;
pub mod finders;
pub mod gateway;
