pub mod manifest;
pub mod manifest_v1;
