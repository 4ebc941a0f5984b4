mod backoff;
mod poller;

pub use backoff::BackoffConfig;
pub use poller::{ConvergencePoller, PollProgress};
