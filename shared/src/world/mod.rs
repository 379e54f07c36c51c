pub mod delta_set;
pub mod replicate;
