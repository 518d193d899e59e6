// Node-style module resolution over a package's source root and its node_modules directories.

mod resolver;

pub use crate::resolver::{Resolution, Resolver, ResolverOptions};
