mod catalog;

pub use catalog::{Catalog, Metadata};
