pub mod filesystem;

pub use filesystem::{account_local_part, safe_file_name, AttachmentStore};
