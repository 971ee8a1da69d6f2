//! DxO Optics Pro (`.dop`) sidecar support.
//!
//! - **parser**: recursive-descent parser producing a [`KeyValuePair`]
//! - **value**: the [`DopValue`] tree and typed accessors
//! - **sidecar**: locating a sidecar and reading the image rank from it

pub mod parser;
pub mod sidecar;
pub mod value;

pub use parser::{parse_document, parse_reader};
pub use sidecar::{read_dop_properties, sidecar_path};
pub use value::{get, get_map_value, DopGroup, DopValue, FromDopValue, KeyValuePair};
