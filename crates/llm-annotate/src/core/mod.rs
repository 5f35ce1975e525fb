pub mod backend;
pub mod component;
pub mod config;
mod errors;
pub mod journal;
pub mod pipe;
pub mod serialize;
pub mod task;

pub use backend::*;
pub use component::*;
pub use config::*;
pub use errors::{BatchStage, ComponentError, ExchangeSide, SerializationError};
pub use journal::{ExchangeJournal, ExchangeRecord};
pub use pipe::*;
pub use serialize::*;
pub use task::*;
