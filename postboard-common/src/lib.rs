pub mod model;
pub mod snowflake;
pub mod wallet;
