pub use raw::*;

mod raw;
