pub mod chat;
pub mod errors;
pub mod events;
pub mod params;
pub mod results;
