pub mod backup;

pub use backup::{BackupFile, BackupRecord};
