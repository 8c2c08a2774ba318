pub mod display;
pub mod driver;
pub mod machine;
