mod fs;

pub use fs::FsArchiveStore;
