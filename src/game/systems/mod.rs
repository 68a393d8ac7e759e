pub mod ai;
pub mod infection;
pub mod physics;
