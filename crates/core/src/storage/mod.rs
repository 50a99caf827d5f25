mod error;
mod stream;
mod traits;
mod types;

pub use error::{Result, StoreError};
pub use stream::{
    EntityStream, ErrorHandler, ProgressHandler, StreamMeta, StreamOptions, StreamProgress,
    StreamResult,
};
pub use traits::DataStore;
pub use types::{Item, KeyInput, KeyPatterns, QueryParams, QueryValue};
