pub mod dates;
pub mod normalize;
pub mod similarity;

pub use dates::*;
pub use normalize::*;
pub use similarity::*;
