//! Plan repository contract and an in-memory implementation

mod error;
pub mod memory;
pub mod traits;

pub use error::{FetchError, UpdateError};
pub use memory::InMemoryPlanRepository;
pub use traits::{PlanPatch, PlanRepository};
