pub mod controller;
pub mod lifecycle;
pub mod scheduler;
pub mod window;

pub use controller::FeedController;
pub use lifecycle::{AppLifecycle, LifecycleBridge, LifecycleTransition};
pub use scheduler::VisibilityScheduler;
pub use window::RenderWindow;
