pub(crate) mod bits;
pub(crate) mod cursor;
pub(crate) mod frame;
pub(crate) mod function;
