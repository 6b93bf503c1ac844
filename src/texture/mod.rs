pub(crate) mod source;
pub(crate) mod store;
pub(crate) mod surface;
