pub mod admin_message_listener;
pub mod broadcast_dispatcher;
pub mod delivery_reconciler;
pub mod message_notifier;
pub mod token_registrar;

pub use admin_message_listener::*;
pub use broadcast_dispatcher::*;
pub use delivery_reconciler::*;
pub use message_notifier::*;
pub use token_registrar::*;
