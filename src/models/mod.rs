pub mod account;
pub mod layout;

pub use account::{AccountRecord, RecordField};
pub use layout::{CardLayout, LoginLayout, PortalLayout, StatementLayout};
