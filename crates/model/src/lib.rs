pub mod photo;
pub mod pin;

pub use photo::{Photo, PhotoPage};
pub use pin::Pin;
