pub mod arch;
pub mod file_options;
pub mod input_resource;
pub mod package_json;
pub mod package_unit;
pub mod resource;
