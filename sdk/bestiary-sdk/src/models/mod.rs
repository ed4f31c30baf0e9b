pub mod creature;
pub mod criteria;
pub mod matchup;
pub mod registry;
