pub mod bubble;
pub mod window;
