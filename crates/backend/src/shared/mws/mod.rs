pub mod api;
pub mod client;
pub mod error;
pub mod fields;
pub mod registry;
pub mod tree;

pub use api::MwsApi;
pub use error::MwsError;
pub use fields::{FieldMap, FieldValue};
pub use registry::ConnectionRegistry;
pub use tree::XmlNode;
