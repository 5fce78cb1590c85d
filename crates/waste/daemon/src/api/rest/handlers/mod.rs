//! API request handlers

mod entries;
mod health;
mod matrix;
mod months;
mod official;

pub use entries::*;
pub use health::*;
pub use matrix::*;
pub use months::*;
pub use official::*;
