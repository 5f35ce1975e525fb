pub mod doc;
pub mod example;
pub mod vocab;

pub use doc::*;
pub use example::*;
pub use vocab::*;
