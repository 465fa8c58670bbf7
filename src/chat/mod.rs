pub mod events;
pub mod ingestion;
pub mod notifier;
pub mod signature;
pub mod slack;

pub use notifier::Notifier;
pub use slack::SlackNotifier;
