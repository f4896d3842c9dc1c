//! A remote feed and the split of candidate packages into published / to publish

use crate::core::context::RegistryContext;
use crate::core::error::{FeedError, FeedResult};
use crate::core::identity::{parse_package_version, PackageIdentity, ProjectToPublish};
use crate::core::registry::{create_resource, PackageMetadataResource};
use futures::stream::{self, StreamExt, TryStreamExt};
use semver::Version;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Candidates split by whether the feed already has them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub to_publish: Vec<ProjectToPublish>,
    pub already_published: usize,
}

/// One package feed a build may publish to.
///
/// The partition is computed by the first successful existence pass and never
/// recomputed for this instance.
pub struct Feed {
    name: String,
    resource: Arc<dyn PackageMetadataResource>,
    context: Arc<RegistryContext>,
    partition: OnceCell<Partition>,
}

impl Feed {
    /// Bind `name` to the feed at `base_url`
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        context: Arc<RegistryContext>,
    ) -> FeedResult<Self> {
        let resource = create_resource(base_url, context.http(), context.credentials().clone())?;
        Self::with_resource(name, resource, context)
    }

    /// Bind `name` to an already-built metadata resource
    pub fn with_resource(
        name: impl Into<String>,
        resource: Arc<dyn PackageMetadataResource>,
        context: Arc<RegistryContext>,
    ) -> FeedResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FeedError::Configuration(
                "Feed name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            resource,
            context,
            partition: OnceCell::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_url(&self) -> &str {
        self.resource.source_url()
    }

    /// Query the feed for every candidate at `target_version`, using the
    /// configured concurrency
    pub async fn check_existence(
        &self,
        candidates: &[ProjectToPublish],
        target_version: &str,
    ) -> FeedResult<()> {
        let limit = self.context.options().max_concurrency;
        self.check_existence_with_concurrency(candidates, target_version, limit)
            .await
    }

    /// Like [`Feed::check_existence`] with up to `limit` queries in flight.
    /// Results are consumed in input order.
    pub async fn check_existence_with_concurrency(
        &self,
        candidates: &[ProjectToPublish],
        target_version: &str,
        limit: usize,
    ) -> FeedResult<()> {
        let version = parse_package_version(target_version)?;
        if self.partition.initialized() {
            return Ok(());
        }

        self.partition
            .get_or_try_init(|| self.compute_partition(candidates, &version, limit.max(1)))
            .await?;
        Ok(())
    }

    async fn compute_partition(
        &self,
        candidates: &[ProjectToPublish],
        version: &Version,
        limit: usize,
    ) -> FeedResult<Partition> {
        let identities = candidates
            .iter()
            .map(|c| PackageIdentity::new(c.name.clone(), version.clone()))
            .collect::<FeedResult<Vec<_>>>()?;

        let context = &self.context;
        let found: Vec<bool> = stream::iter(identities.iter())
            .map(|identity| async move {
                if context.cancellation().is_cancelled() {
                    return Err(FeedError::Canceled);
                }
                self.resource
                    .exists(
                        identity,
                        context.cache(),
                        context.logger(),
                        context.cancellation(),
                    )
                    .await
            })
            .buffered(limit)
            .try_collect()
            .await?;

        let logger = context.logger();
        let mut partition = Partition::default();
        for (candidate, exists) in candidates.iter().zip(found) {
            if exists {
                partition.already_published += 1;
            } else {
                logger.log_debug(&format!(
                    "{} {} is not on {} and must be pushed",
                    candidate, version, self.name
                ));
                partition.to_publish.push(candidate.clone());
            }
        }

        logger.log_debug(&format!(
            "{}: {} package(s) to push, {} already published",
            self.name,
            partition.to_publish.len(),
            partition.already_published
        ));
        Ok(partition)
    }

    /// The computed partition, if the existence pass has run
    pub fn partition(&self) -> Option<&Partition> {
        self.partition.get()
    }

    pub fn packages_to_publish(&self) -> &[ProjectToPublish] {
        self.partition
            .get()
            .map(|p| p.to_publish.as_slice())
            .unwrap_or(&[])
    }

    pub fn already_published_count(&self) -> usize {
        self.partition
            .get()
            .map(|p| p.already_published)
            .unwrap_or(0)
    }

    /// Human-readable summary, also logged at information level.
    ///
    /// Before a successful existence pass this reports that the feed has not
    /// been checked rather than an empty result.
    pub fn describe_status(&self, candidates: &[ProjectToPublish]) -> String {
        let logger = self.context.logger();
        let Some(partition) = self.partition.get() else {
            let line = format!("{}: existence not checked yet", self.name);
            logger.log_warning(&line);
            return line;
        };

        let to_publish = partition.to_publish.as_slice();
        let already = partition.already_published;

        let lines = if to_publish.is_empty() {
            vec![format!(
                "{}: no packages must be pushed ({} already available)",
                self.name, already
            )]
        } else if already == 0 {
            vec![format!(
                "{}: all {} packages must be pushed",
                self.name,
                to_publish.len()
            )]
        } else {
            let pushed: Vec<&ProjectToPublish> = candidates
                .iter()
                .filter(|c| !to_publish.contains(c))
                .collect();
            vec![
                format!("{}: {} must be pushed", self.name, join_names(to_publish.iter())),
                format!("{}: {} already pushed", self.name, join_names(pushed.into_iter())),
            ]
        };

        for line in &lines {
            logger.log_information(line);
        }
        lines.join("\n")
    }
}

fn join_names<'a>(projects: impl Iterator<Item = &'a ProjectToPublish>) -> String {
    projects
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Debug for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feed")
            .field("name", &self.name)
            .field("source_url", &self.source_url())
            .field("partition", &self.partition.get())
            .finish()
    }
}
