pub mod aggregate;
pub mod rewrite;
