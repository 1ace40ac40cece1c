pub mod email;
pub mod routes;
pub mod store;

pub use email::{HttpMailbox, MailMessage, MailboxClient};
pub use routes::{create_router, AppState};
pub use store::{ChannelId, ChannelKind, OtpChannel, RelayStore};
