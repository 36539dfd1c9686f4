pub mod dispatcher;
pub mod job;
pub mod registry;
pub mod staging;
