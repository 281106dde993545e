//! Value types shared by quota services.

pub mod pagination;
