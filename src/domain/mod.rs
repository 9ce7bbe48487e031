//! Domain model: value objects, aggregates, events and persistence ports
pub mod aggregates;
pub mod events;
pub mod repository;
pub mod value_objects;
