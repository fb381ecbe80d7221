pub mod journal;
pub mod journal_entry;
