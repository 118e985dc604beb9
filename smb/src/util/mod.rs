pub(crate) mod flags_helper;
pub mod short_name;
