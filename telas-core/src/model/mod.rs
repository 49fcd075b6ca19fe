//! Data model types for the roll inventory.

mod client;
mod lenient;
mod request;
mod roll;

pub use client::{Client, ClientId, ClientPatch, NewClient};
pub use request::{CandidateQuery, CutRequest, RollFilter};
pub use roll::{usable_metraje, NewRoll, Roll, RollId, RollPatch};
