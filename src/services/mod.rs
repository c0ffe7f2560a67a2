// Services module - business logic layer

pub mod notifier;
pub mod signup_service;

pub use notifier::{build_notifier, ConsoleNotifier, Notifier, NotifierError, SnsNotifier};
pub use signup_service::{NotificationSettings, SignupService};
