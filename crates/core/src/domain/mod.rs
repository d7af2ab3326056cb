pub mod intake;
pub mod role;
pub mod staging;
