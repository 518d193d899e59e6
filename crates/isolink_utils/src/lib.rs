pub mod base64;
pub mod concat_string;
pub mod ecmascript;
pub mod indexmap;
pub mod path_ext;
pub mod xxhash;
