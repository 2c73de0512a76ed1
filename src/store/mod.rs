pub mod photos;
pub mod records;
