pub mod attributes;
pub mod error;
pub mod prefix;
pub mod trie;
pub mod utils;
