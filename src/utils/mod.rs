pub mod camel_slug;
mod discord_timestamp;
pub mod formatting;

pub use discord_timestamp::{timestamp, TimestampStyle};
