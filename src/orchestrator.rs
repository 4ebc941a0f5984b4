use tracing::Instrument;

use crate::config::StartStopConfig;
use crate::convergence::{ConvergencePoller, PollProgress};
use crate::error::StartStopError;
use crate::event::StartStopEvent;
use crate::gateway::InstanceGateway;
use crate::grouping::{GroupKey, Groups, group_by_tag};
use crate::ordering::{BucketKey, OrderedBuckets, by_order};
use crate::report::{BatchRecord, RunReport};

/// Hooks for following a run batch by batch. Every method defaults to a no-op.
pub trait RunObserver {
    fn batch_started(&mut self, _group: &GroupKey, _bucket: &BucketKey, _ids: &[String]) {}
    fn still_waiting(&mut self, _progress: &PollProgress<'_>) {}
    fn batch_finished(&mut self, _record: &BatchRecord) {}
}

impl RunObserver for () {}

/// A run that stopped at its first failure.
///
/// `report` holds the batches applied before the failure; those are not rolled
/// back. It is `None` when the event was rejected before any gateway call.
#[derive(Debug, thiserror::Error)]
#[error(
    "run aborted after {} applied batch(es)",
    .report.as_ref().map_or(0, |r| r.batches.len())
)]
pub struct RunAborted {
    #[source]
    pub error: StartStopError,
    pub report: Option<RunReport>,
}

/// Ordered buckets of every group, in processing order.
pub type Plan = Vec<(GroupKey, OrderedBuckets)>;

/// Order each group's members. Group order is kept as given.
pub fn plan(groups: &Groups, order_tag: &str, precedence: &[String]) -> Plan {
    groups
        .iter()
        .map(|g| (g.key.clone(), by_order(&g.members, order_tag, precedence)))
        .collect()
}

/// Drives every ordered batch through its transition, one at a time.
pub struct Orchestrator<'a, G> {
    gateway: &'a G,
    config: &'a StartStopConfig,
}

impl<'a, G: InstanceGateway> Orchestrator<'a, G> {
    pub fn new(gateway: &'a G, config: &'a StartStopConfig) -> Self {
        Self { gateway, config }
    }

    /// Describe the instances the event selects and group them.
    pub async fn discover(&self, event: &StartStopEvent) -> Result<Groups, StartStopError> {
        let filters = event.filters(&self.config.management_tag);
        tracing::debug!(?filters, "describing matching instances");
        let instances = self.gateway.describe_matching(&filters).await?;
        tracing::info!(count = instances.len(), "matched instances");

        let groups = group_by_tag(instances, &event.group_by_tag);
        if groups.is_empty() {
            tracing::warn!("no managed instances matched the tag filters");
        }
        tracing::debug!(
            groups = ?groups.iter().map(|g| g.key.to_string()).collect::<Vec<_>>(),
            "grouped instances"
        );
        Ok(groups)
    }

    /// Validate the event, then discover and apply it inside a run span. On
    /// failure the report collected so far travels with the error.
    pub async fn run(
        &self,
        event: &StartStopEvent,
        observer: &mut impl RunObserver,
    ) -> Result<RunReport, RunAborted> {
        let action = event
            .validate()
            .map_err(|error| RunAborted { error, report: None })?;
        let mut report = RunReport::new(action, event.dry_run);
        let span = tracing::info_span!(
            "startstop",
            run_id = %report.run_id,
            %action,
            dry_run = event.dry_run
        );

        let outcome = async {
            let groups = self.discover(event).await?;
            self.apply(
                &groups,
                &event.order_by_tag,
                &event.order_by,
                &mut report,
                observer,
            )
            .await
        }
        .instrument(span)
        .await;

        match outcome {
            Ok(()) => Ok(report),
            Err(error) => Err(RunAborted {
                error,
                report: Some(report),
            }),
        }
    }

    /// Issue one transition per ordered bucket, group by group, and wait for
    /// each batch to converge before starting the next one. The action and
    /// dry-run flag come from `report`, which collects one record per batch.
    ///
    /// The first failure aborts the run. Batches already applied stay applied
    /// and stay recorded in `report`.
    pub async fn apply(
        &self,
        groups: &Groups,
        order_tag: &str,
        precedence: &[String],
        report: &mut RunReport,
        observer: &mut impl RunObserver,
    ) -> Result<(), StartStopError> {
        let request = report.request();
        let target = request.action.target_state();
        let poller = ConvergencePoller::new(self.gateway, &self.config.backoff);
        let skip_wait = request.dry_run && self.config.skip_wait_on_dry_run;

        if request.dry_run && !skip_wait {
            tracing::warn!(
                "dry run still waits for convergence; set skip_wait_on_dry_run to skip the wait"
            );
        }

        for (group, buckets) in plan(groups, order_tag, precedence) {
            tracing::debug!(group = %group, buckets = buckets.len(), "ordered group");
            for bucket in &buckets {
                let ids = bucket.instance_ids();
                tracing::info!(
                    group = %group,
                    bucket = %bucket.key,
                    action = %request.action,
                    dry_run = request.dry_run,
                    instance_ids = ?ids,
                    "requesting transition"
                );
                observer.batch_started(&group, &bucket.key, &ids);

                let ack = self
                    .gateway
                    .request_transition(&ids, request.action, request.dry_run)
                    .await?;
                if request.dry_run {
                    tracing::info!(transitions = ?ack.transitions, "dry run output");
                }

                let record = if skip_wait {
                    tracing::info!(group = %group, bucket = %bucket.key, "skipping wait for dry run");
                    BatchRecord {
                        group: group.to_string(),
                        bucket: bucket.key.to_string(),
                        instance_ids: ids,
                        attempts: 0,
                        waited_ms: 0,
                        wait_skipped: true,
                    }
                } else {
                    let convergence = poller
                        .await_state_with(&ids, target, |p| observer.still_waiting(&p))
                        .await?;
                    BatchRecord {
                        group: group.to_string(),
                        bucket: bucket.key.to_string(),
                        instance_ids: ids,
                        attempts: convergence.attempts,
                        waited_ms: convergence.waited.as_millis() as u64,
                        wait_skipped: false,
                    }
                };

                observer.batch_finished(&record);
                report.record(record);
            }
        }

        report.finish();
        tracing::info!(
            batches = report.batches.len(),
            instances = report.instance_count(),
            duration_ms = report.duration_ms,
            "run complete"
        );
        Ok(())
    }
}
