pub mod fan_letter;
pub mod schedule;
pub mod song;
pub mod weather;
