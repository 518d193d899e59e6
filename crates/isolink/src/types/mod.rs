pub mod bundle_output;
pub mod js_output;
pub mod scanned_file;
