pub mod catalog;
pub mod pipeline;
