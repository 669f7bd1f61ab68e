pub mod db;
pub mod docs;
pub mod letters;
pub mod schedules;

pub use db::Database;
pub use docs::SqliteDocIndex;
pub use letters::SqliteFanLetterStore;
pub use schedules::SqliteScheduleStore;
