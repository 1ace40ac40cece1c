pub mod extract;
pub mod mask;

pub use extract::{extract_code, extract_link};
pub use mask::mask_sensitive;
