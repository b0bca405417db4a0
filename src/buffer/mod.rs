pub mod lru_k_replacer;
mod replace;

pub use self::replace::Replacer;

#[cfg(test)]
mod lru_k_replacer_test;
