pub mod javascript;

pub use javascript::{decode_json, JavaScriptRunner};
