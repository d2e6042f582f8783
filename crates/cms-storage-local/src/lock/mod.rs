mod name_lock;

pub use name_lock::NameLocks;
