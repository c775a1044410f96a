pub mod catalog;
pub mod session;
pub mod viewability;

pub use catalog::CatalogItem;
pub use session::{ActiveViewSession, ClosedViewSession};
pub use viewability::ViewabilityRecord;
