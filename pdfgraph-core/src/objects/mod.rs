//! Value types shared by the read and write paths.

mod dictionary;
mod stream;
mod value;

pub use dictionary::Dictionary;
pub use stream::Stream;
pub use value::{ObjectId, Value};
