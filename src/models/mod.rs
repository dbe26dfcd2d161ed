pub mod bulk;
pub mod record;
pub mod server_info;
