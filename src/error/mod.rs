mod modhost;

pub use modhost::{ApiErrorBody, ApiErrorObject, ModhostError};
