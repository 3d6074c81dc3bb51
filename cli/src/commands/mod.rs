pub mod questions;
pub mod score;
pub mod take;
