//! Storefront domain: pricing rules, aggregates and their events.
//!
//! Nothing in here touches the database or the network.

pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod reports;
pub mod value_objects;
