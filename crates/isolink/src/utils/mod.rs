pub mod normalize_options;
pub mod serve_path;
