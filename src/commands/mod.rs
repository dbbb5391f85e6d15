pub mod index;
pub mod reembed;
pub mod search;
pub mod stats;
