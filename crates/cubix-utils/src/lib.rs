pub mod id;
pub mod visit;
