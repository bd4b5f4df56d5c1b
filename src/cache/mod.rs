pub mod downloads;
pub mod previews;
