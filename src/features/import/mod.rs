pub mod upload;

pub use upload::{parse_upload, UploadedTerm};
