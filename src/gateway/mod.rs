pub mod client;
pub mod error;
pub mod types;

use std::collections::HashMap;

pub use client::HttpGateway;
pub use error::GatewayError;
pub use types::{Filter, TransitionAck};

use crate::instance::{Action, Instance, InstanceState};

/// Control-plane operations the orchestrator depends on.
#[allow(async_fn_in_trait)]
pub trait InstanceGateway {
    /// Instances matching every filter.
    async fn describe_matching(&self, filters: &[Filter]) -> Result<Vec<Instance>, GatewayError>;

    /// Request one state transition for all `ids` as a unit.
    ///
    /// Stop requests never force and never hibernate.
    async fn request_transition(
        &self,
        ids: &[String],
        action: Action,
        dry_run: bool,
    ) -> Result<TransitionAck, GatewayError>;

    /// Current state per instance id. Ids unknown to the control plane are absent.
    async fn describe_states(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, InstanceState>, GatewayError>;
}
