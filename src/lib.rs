pub mod buffer;
pub mod container;

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate slog;
extern crate slog_async;
extern crate slog_term;

pub use self::buffer::lru_k_replacer::LRUKReplacer;
pub use self::buffer::Replacer;
pub use self::container::hash::extendible_hash_table::ExtendibleHashTable;

pub mod errors {
    pub use anyhow::Error;
    pub use anyhow::Result;
}

pub fn default_logger() -> slog::Logger {
    use slog::Drain;

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, o!())
}

pub type FrameId = usize;
