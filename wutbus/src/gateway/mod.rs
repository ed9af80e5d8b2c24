pub(crate) mod adapter;
pub(crate) mod request;
pub(crate) mod server;
