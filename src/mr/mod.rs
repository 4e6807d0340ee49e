pub mod error;
pub mod function;
pub mod loader;
pub mod pipeline;
pub mod table;
pub mod worker;
