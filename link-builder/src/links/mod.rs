pub mod campaign_rules;
pub mod creative;
pub mod generator;
pub mod query;
pub mod resolver;
pub mod tracker;
pub mod types;
