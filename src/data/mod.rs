pub mod header;
pub mod record;
