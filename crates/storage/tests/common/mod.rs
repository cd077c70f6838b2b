pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{ROOT, seed_tag, tag_dir};
