pub(crate) mod client_key;
