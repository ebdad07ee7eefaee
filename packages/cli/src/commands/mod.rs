pub mod init;
pub mod publish;
pub mod serve;
pub mod status;

pub use init::{init, InitArgs};
pub use publish::{publish, PublishArgs};
pub use serve::{serve, ServeArgs};
pub use status::{status, StatusArgs};
