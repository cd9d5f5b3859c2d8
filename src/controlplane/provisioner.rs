//! Storage Pool Provisioner
//!
//! Sequences the creation of a pool on a cluster:
//! - validate the request (synchronously, before anything is dispatched)
//! - look up the cluster and pick one of its monitors
//! - resolve the PG count
//! - create the pool through the cluster backend and wait for completion
//! - persist the storage entity
//!
//! Everything after validation runs as a task; callers get its id at once
//! and follow progress through the task's status log.

use crate::controlplane::monitor::select_monitor;
use crate::controlplane::placement::PgCalculator;
use crate::domain::models::{AddStorageRequest, Storage, ValidatedStorageRequest};
use crate::domain::ports::{
    ClusterBackendRef, CreatePoolParams, PollPolicy, TaskRunnerRef, TopologyRepositoryRef,
};
use crate::error::{Error, Result};
use crate::metrics::ProvisionMetrics;
use crate::tasks::Task;
use futures::FutureExt;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Name of the task running a pool creation
pub const CREATE_STORAGE_TASK: &str = "CEPH-CreateStorage";

// =============================================================================
// Provisioner Configuration
// =============================================================================

/// Configuration for the provisioner
#[derive(Debug, Clone, Default)]
pub struct ProvisionerConfig {
    /// How long pool creation requests are polled on the cluster
    pub poll_policy: PollPolicy,
}

// =============================================================================
// Provisioner
// =============================================================================

/// Orchestrates storage pool creation across store, cluster and task runner
pub struct Provisioner {
    config: ProvisionerConfig,
    repository: TopologyRepositoryRef,
    backend: ClusterBackendRef,
    tasks: TaskRunnerRef,
    pg_calculator: PgCalculator,
    metrics: Option<Arc<ProvisionMetrics>>,
}

impl Provisioner {
    pub fn new(
        config: ProvisionerConfig,
        repository: TopologyRepositoryRef,
        backend: ClusterBackendRef,
        tasks: TaskRunnerRef,
    ) -> Self {
        Self {
            config,
            pg_calculator: PgCalculator::new(repository.clone()),
            repository,
            backend,
            tasks,
            metrics: None,
        }
    }

    /// Record provisioning outcomes in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<ProvisionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validate a creation request and start provisioning it.
    ///
    /// Returns the task id once the work is dispatched. Only validation and
    /// task submission failures are returned here; everything else ends up
    /// in the task's status.
    pub fn create_storage(
        self: &Arc<Self>,
        cluster_id: &str,
        request: AddStorageRequest,
    ) -> Result<Uuid> {
        let cluster_id = parse_cluster_id(cluster_id)?;
        let validated = request.validate()?;

        info!(
            "Accepted storage request {} for cluster {}",
            validated.request.name, cluster_id
        );

        let provisioner = self.clone();
        self.tasks.run(
            CREATE_STORAGE_TASK,
            Box::new(move |task| {
                async move {
                    provisioner
                        .run_create_storage(cluster_id, validated, task)
                        .await
                }
                .boxed()
            }),
        )
    }

    async fn run_create_storage(
        &self,
        cluster_id: Uuid,
        validated: ValidatedStorageRequest,
        task: Arc<Task>,
    ) {
        task.update_status(format!(
            "Started ceph provider pool creation: {}",
            task.id()
        ));
        // Released on drop, so a panicking step still leaves the gauge.
        let guard = self.metrics.as_ref().map(|m| m.track());

        let outcome = match self.provision(cluster_id, &validated, &task).await {
            Ok(storage) => {
                info!(
                    "Storage {} ({}) created on cluster {}",
                    storage.name, storage.storage_id, cluster_id
                );
                task.succeed("Success");
                "success"
            }
            Err(e) => {
                error!(
                    task_id = %task.id(),
                    kind = e.kind(),
                    remote = e.is_remote(),
                    "Creating storage {} on cluster {} failed: {}",
                    validated.request.name, cluster_id, e
                );
                task.fail(format!("Failed. error: {}", e));
                e.kind()
            }
        };

        if let Some(guard) = guard {
            guard.complete(outcome);
        }
    }

    /// Run every provisioning step, returning the persisted entity
    pub async fn provision(
        &self,
        cluster_id: Uuid,
        validated: &ValidatedStorageRequest,
        task: &Task,
    ) -> Result<Storage> {
        let request = &validated.request;

        task.update_status("Getting cluster details");
        let cluster = self
            .repository
            .get_cluster(&cluster_id)
            .await?
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "Cluster".into(),
                name: cluster_id.to_string(),
            })?;

        task.update_status("Getting mons for cluster");
        let nodes = self.repository.list_nodes(&cluster_id).await?;
        let mon_node_id = select_monitor(&cluster_id, &nodes)?.node_id;

        task.update_status("Getting mon node details");
        let mon = self
            .repository
            .get_node(&mon_node_id)
            .await?
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "Node".into(),
                name: mon_node_id.to_string(),
            })?;

        task.update_status("Creating pool");
        let pg_num = self
            .pg_calculator
            .resolve(
                &cluster_id,
                &validated.options,
                validated.size_bytes,
                request.replicas,
            )
            .await;

        let params = CreatePoolParams {
            name: request.name.clone(),
            cluster_id,
            mon: mon.hostname.clone(),
            cluster_name: cluster.name.clone(),
            pg_num,
            replicas: request.replicas,
            quota_max_objects: validated.options.quota_max_objects.unwrap_or(0),
            quota_max_bytes: validated.options.quota_max_bytes.unwrap_or(0),
        };
        self.backend
            .create_pool(&params, &self.config.poll_policy)
            .await?;

        task.update_status("Persisting the storage entity");
        let storage = Storage::from_request(cluster_id, request);
        if let Err(e) = self.repository.insert_storage(storage.clone()).await {
            error!(
                "Pool {} exists on cluster {} but has no storage record: {}",
                request.name, cluster.name, e
            );
            return Err(match e {
                Error::Persistence(_) => e,
                other => Error::Persistence(other.to_string()),
            });
        }

        Ok(storage)
    }

    /// List storage entities of a cluster
    pub async fn list_storage(&self, cluster_id: &str) -> Result<Vec<Storage>> {
        let cluster_id = parse_cluster_id(cluster_id)?;
        self.repository.list_storage(&cluster_id).await
    }

    /// Get a storage entity by id
    pub async fn get_storage(&self, storage_id: &str) -> Result<Option<Storage>> {
        let storage_id = Uuid::parse_str(storage_id.trim()).map_err(|_| {
            Error::Validation(format!("Error parsing the storage id: {}", storage_id))
        })?;
        self.repository.get_storage(&storage_id).await
    }
}

fn parse_cluster_id(cluster_id: &str) -> Result<Uuid> {
    Uuid::parse_str(cluster_id.trim())
        .map_err(|_| Error::Validation(format!("Error parsing the cluster id: {}", cluster_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::backends::cephapi::testing::{serve, MockCluster};
    use crate::controlplane::backends::{CephApi, CephApiConfig};
    use crate::domain::models::{Cluster, Node, StorageLogicalUnit, StorageStatus, OSD_UNIT_TYPE};
    use crate::domain::ports::{ClusterBackend, Mon, Osd, TopologyRepository};
    use crate::metrics::ABORTED_OUTCOME;
    use crate::store::MemoryTopologyStore;
    use crate::tasks::{TaskManager, TaskOutcome};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::collections::BTreeMap;
    use std::time::Duration;

    const TIB: u64 = 1 << 40;

    /// Store whose inserts always fail
    struct ReadOnlyStore(Arc<MemoryTopologyStore>);

    #[async_trait]
    impl TopologyRepository for ReadOnlyStore {
        async fn get_cluster(&self, id: &Uuid) -> Result<Option<Cluster>> {
            self.0.get_cluster(id).await
        }
        async fn list_nodes(&self, id: &Uuid) -> Result<Vec<Node>> {
            self.0.list_nodes(id).await
        }
        async fn get_node(&self, id: &Uuid) -> Result<Option<Node>> {
            self.0.get_node(id).await
        }
        async fn list_logical_units(&self, id: &Uuid, t: &str) -> Result<Vec<StorageLogicalUnit>> {
            self.0.list_logical_units(id, t).await
        }
        async fn insert_storage(&self, _: Storage) -> Result<()> {
            Err(Error::Store("write concern failed".into()))
        }
        async fn get_storage(&self, id: &Uuid) -> Result<Option<Storage>> {
            self.0.get_storage(id).await
        }
        async fn list_storage(&self, id: &Uuid) -> Result<Vec<Storage>> {
            self.0.list_storage(id).await
        }
    }

    /// Backend that panics while creating the pool
    struct PanickingBackend;

    #[async_trait]
    impl ClusterBackend for PanickingBackend {
        async fn create_cluster(&self, _: &str, _: Uuid, _: &[Mon]) -> Result<bool> {
            Ok(true)
        }
        async fn add_mon(&self, _: &str, _: &[Mon]) -> Result<bool> {
            Ok(true)
        }
        async fn start_mon(&self, _: &[String]) -> Result<bool> {
            Ok(true)
        }
        async fn add_osd(&self, _: &str, _: &Osd) -> Result<bool> {
            Ok(true)
        }
        async fn create_pool(&self, params: &CreatePoolParams, _: &PollPolicy) -> Result<()> {
            panic!("lost connection to {}", params.mon);
        }
        async fn list_pools(&self, _: &str, _: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn cluster_up(&self, _: &str, _: &str) -> Result<bool> {
            Ok(true)
        }
        fn backend_name(&self) -> &str {
            "panicking"
        }
    }

    struct Harness {
        provisioner: Arc<Provisioner>,
        store: Arc<MemoryTopologyStore>,
        tasks: Arc<TaskManager>,
        mock: Arc<MockCluster>,
        metrics: Arc<ProvisionMetrics>,
        cluster_id: Uuid,
        mon_hosts: Vec<String>,
    }

    struct Topology {
        mons: usize,
        osds: usize,
        read_only: bool,
        poll_policy: PollPolicy,
    }

    impl Default for Topology {
        fn default() -> Self {
            Self {
                mons: 3,
                osds: 60,
                read_only: false,
                poll_policy: PollPolicy {
                    interval: Duration::from_millis(10),
                    max_attempts: Some(50),
                    deadline: None,
                },
            }
        }
    }

    async fn harness(mock: MockCluster, topology: Topology) -> Harness {
        let mock = Arc::new(mock);
        let addr = serve(mock.clone()).await;

        let store = Arc::new(MemoryTopologyStore::new());
        let cluster_id = Uuid::new_v4();
        store.add_cluster(Cluster {
            cluster_id,
            name: "ceph-test".into(),
            status: "ok".into(),
        });

        let mut mon_hosts = Vec::new();
        for i in 0..topology.mons {
            let hostname = format!("127.0.0.{}", i + 1);
            mon_hosts.push(hostname.clone());
            store.add_node(Node {
                node_id: Uuid::new_v4(),
                hostname,
                cluster_id,
                options: BTreeMap::from([("mon".to_string(), "Y".to_string())]),
            });
        }
        let osd_node = Uuid::new_v4();
        store.add_node(Node {
            node_id: osd_node,
            hostname: "osd-host".into(),
            cluster_id,
            options: BTreeMap::new(),
        });
        for _ in 0..topology.osds {
            store.add_logical_unit(StorageLogicalUnit {
                slu_id: Uuid::new_v4(),
                cluster_id,
                node_id: osd_node,
                unit_type: OSD_UNIT_TYPE.into(),
                storage_device_size: TIB,
            });
        }

        let repository: TopologyRepositoryRef = if topology.read_only {
            Arc::new(ReadOnlyStore(store.clone()))
        } else {
            store.clone()
        };

        let backend = Arc::new(
            CephApi::new(
                CephApiConfig {
                    port: addr.port(),
                    request_timeout: Duration::from_secs(5),
                    ..Default::default()
                },
                repository.clone(),
            )
            .unwrap(),
        );
        let tasks = TaskManager::new();
        let metrics = Arc::new(ProvisionMetrics::new().unwrap());
        let provisioner = Arc::new(
            Provisioner::new(
                ProvisionerConfig {
                    poll_policy: topology.poll_policy,
                },
                repository,
                backend,
                tasks.clone(),
            )
            .with_metrics(metrics.clone()),
        );

        Harness {
            provisioner,
            store,
            tasks,
            mock,
            metrics,
            cluster_id,
            mon_hosts,
        }
    }

    fn request() -> AddStorageRequest {
        AddStorageRequest {
            name: "rbd".into(),
            storage_type: "replicated".into(),
            tags: vec!["gold".into()],
            size: "100GB".into(),
            replicas: 3,
            profile: "general".into(),
            ..Default::default()
        }
    }

    impl Harness {
        async fn run(&self, request: AddStorageRequest) -> Arc<Task> {
            let task_id = self
                .provisioner
                .create_storage(&self.cluster_id.to_string(), request)
                .unwrap();
            let task = self.tasks.get(&task_id).unwrap();
            tokio::time::timeout(Duration::from_secs(10), task.wait())
                .await
                .unwrap();
            task
        }

        async fn stored(&self) -> Vec<Storage> {
            self.store.list_storage(&self.cluster_id).await.unwrap()
        }
    }

    fn failure(task: &Task) -> String {
        match task.outcome() {
            Some(TaskOutcome::Failed(message)) => message,
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_creates_storage() {
        let h = harness(MockCluster::completing_after(2), Topology::default()).await;

        let task = h.run(request()).await;
        assert_eq!(task.outcome(), Some(TaskOutcome::Succeeded));
        assert_eq!(task.name(), CREATE_STORAGE_TASK);

        let submitted = h.mock.submitted();
        assert_eq!(submitted.len(), 1);
        let host = submitted[0].host.split(':').next().unwrap().to_string();
        assert!(h.mon_hosts.contains(&host), "{} is not a monitor", host);
        assert_eq!(submitted[0].fsid, h.cluster_id.to_string());
        assert_eq!(submitted[0].body["pg_num"], 32);
        assert_eq!(submitted[0].body["pgp_num"], 32);
        assert_eq!(submitted[0].body["size"], 3);
        assert_eq!(h.mock.status_reads(), 3);

        let stored = h.stored().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, StorageStatus::Up);
        assert_eq!(stored[0].name, "rbd");
        assert_eq!(stored[0].tags, vec!["gold".to_string()]);
        assert_eq!(h.metrics.provisions("success"), 1);

        let log: Vec<String> = task.status_log().into_iter().map(|e| e.message).collect();
        assert!(log[0].starts_with("Started ceph provider pool creation"));
        assert!(log.contains(&"Persisting the storage entity".to_string()));
        assert_eq!(log.last().map(String::as_str), Some("Success"));
    }

    #[tokio::test]
    async fn test_pgnum_override_is_used_verbatim() {
        let h = harness(
            MockCluster::completing_after(0),
            Topology {
                osds: 100,
                ..Default::default()
            },
        )
        .await;

        let mut req = request();
        req.options.insert("pgnum".into(), "777".into());
        let task = h.run(req).await;

        assert_eq!(task.outcome(), Some(TaskOutcome::Succeeded));
        assert_eq!(h.mock.submitted()[0].body["pg_num"], 777);
        assert_eq!(h.stored().await[0].options.get("pgnum").map(String::as_str), Some("777"));
    }

    #[tokio::test]
    async fn test_quota_values_are_forwarded() {
        let h = harness(MockCluster::completing_after(0), Topology::default()).await;

        let mut req = request();
        req.quota_enabled = true;
        req.quota_params.insert("quota_max_objects".into(), "1000".into());
        req.quota_params.insert("quota_max_bytes".into(), "1048576".into());
        let task = h.run(req).await;

        assert_eq!(task.outcome(), Some(TaskOutcome::Succeeded));
        let body = &h.mock.submitted()[0].body;
        assert_eq!(body["quota_max_objects"], 1000);
        assert_eq!(body["quota_max_bytes"], 1048576);
    }

    #[tokio::test]
    async fn test_malformed_quota_fails_before_dispatch() {
        let h = harness(MockCluster::completing_after(0), Topology::default()).await;

        let mut req = request();
        req.quota_enabled = true;
        req.quota_params.insert("quota_max_objects".into(), "1000".into());
        req.quota_params.insert("quota_max_bytes".into(), "abc".into());

        let result = h
            .provisioner
            .create_storage(&h.cluster_id.to_string(), req);
        assert_matches!(result, Err(Error::Validation(_)));
        assert!(h.tasks.list().is_empty());
        assert!(h.mock.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_cluster_id() {
        let h = harness(MockCluster::completing_after(0), Topology::default()).await;
        let result = h.provisioner.create_storage("not-a-uuid", request());
        assert_matches!(result, Err(Error::Validation(msg)) if msg.contains("cluster id"));
        assert!(h.tasks.list().is_empty());
    }

    #[tokio::test]
    async fn test_remote_500_persists_nothing() {
        let h = harness(
            MockCluster {
                create_status: StatusCode::INTERNAL_SERVER_ERROR,
                ..MockCluster::completing_after(0)
            },
            Topology::default(),
        )
        .await;

        let task = h.run(request()).await;
        let message = failure(&task);
        assert!(message.starts_with("Failed. error: Failed to submit CreatePool"), "{}", message);
        assert!(h.stored().await.is_empty());
        assert_eq!(h.mock.status_reads(), 0);
        assert_eq!(h.metrics.provisions("remote_submit_error"), 1);
    }

    #[tokio::test]
    async fn test_failed_status_read_persists_nothing() {
        let h = harness(
            MockCluster {
                status_code: StatusCode::INTERNAL_SERVER_ERROR,
                ..MockCluster::completing_after(0)
            },
            Topology::default(),
        )
        .await;

        let task = h.run(request()).await;
        let message = failure(&task);
        assert!(
            message.starts_with("Failed. error: Error syncing status of request req-1"),
            "{}",
            message
        );
        assert_eq!(h.mock.submitted().len(), 1);
        assert_eq!(h.mock.status_reads(), 1);
        assert!(h.stored().await.is_empty());
        assert_eq!(h.metrics.provisions("remote_poll_error"), 1);
        assert_eq!(h.metrics.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panicking_backend_releases_in_flight() {
        let store = Arc::new(MemoryTopologyStore::new());
        let cluster_id = Uuid::new_v4();
        store.add_cluster(Cluster {
            cluster_id,
            name: "ceph-test".into(),
            status: "ok".into(),
        });
        store.add_node(Node {
            node_id: Uuid::new_v4(),
            hostname: "mon-1".into(),
            cluster_id,
            options: BTreeMap::from([("mon".to_string(), "Y".to_string())]),
        });

        let tasks = TaskManager::new();
        let metrics = Arc::new(ProvisionMetrics::new().unwrap());
        let provisioner = Arc::new(
            Provisioner::new(
                ProvisionerConfig::default(),
                store.clone(),
                Arc::new(PanickingBackend),
                tasks.clone(),
            )
            .with_metrics(metrics.clone()),
        );

        let task_id = provisioner
            .create_storage(&cluster_id.to_string(), request())
            .unwrap();
        let task = tasks.get(&task_id).unwrap();
        tokio::time::timeout(Duration::from_secs(10), task.wait())
            .await
            .unwrap();

        assert!(failure(&task).contains("task aborted"));
        assert_eq!(metrics.in_flight(), 0);
        assert_eq!(metrics.provisions(ABORTED_OUTCOME), 1);
        assert!(store.list_storage(&cluster_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_monitors() {
        let h = harness(
            MockCluster::completing_after(0),
            Topology {
                mons: 0,
                ..Default::default()
            },
        )
        .await;

        let task = h.run(request()).await;
        assert!(failure(&task).contains("No mons available"));
        assert!(h.mock.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_cluster() {
        let h = harness(MockCluster::completing_after(0), Topology::default()).await;

        let task_id = h
            .provisioner
            .create_storage(&Uuid::new_v4().to_string(), request())
            .unwrap();
        let task = h.tasks.get(&task_id).unwrap();
        tokio::time::timeout(Duration::from_secs(10), task.wait())
            .await
            .unwrap();

        assert!(failure(&task).contains("Resource not found: Cluster/"));
        assert!(h.mock.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_after_remote_success() {
        let h = harness(
            MockCluster::completing_after(0),
            Topology {
                read_only: true,
                ..Default::default()
            },
        )
        .await;

        let task = h.run(request()).await;
        assert!(failure(&task).contains("Failed to persist storage entity"));
        // The pool was created remotely; nothing was recorded locally
        assert_eq!(h.mock.submitted().len(), 1);
        assert!(h.stored().await.is_empty());
        assert_eq!(h.metrics.provisions("persistence_error"), 1);
    }

    #[tokio::test]
    async fn test_bounded_poll_times_out() {
        let h = harness(
            MockCluster::never_completing(),
            Topology {
                poll_policy: PollPolicy {
                    interval: Duration::from_millis(10),
                    max_attempts: Some(4),
                    deadline: None,
                },
                ..Default::default()
            },
        )
        .await;

        let task = h.run(request()).await;
        assert!(failure(&task).contains("not complete after 4 polls"));
        assert!(h.stored().await.is_empty());
    }

    #[tokio::test]
    async fn test_unbounded_poll_never_completes() {
        let h = harness(
            MockCluster::never_completing(),
            Topology {
                poll_policy: PollPolicy::unbounded(Duration::from_millis(10)),
                ..Default::default()
            },
        )
        .await;

        let task_id = h
            .provisioner
            .create_storage(&h.cluster_id.to_string(), request())
            .unwrap();
        let task = h.tasks.get(&task_id).unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(300), task.wait()).await;
        assert!(waited.is_err());
        assert!(!task.is_done());
        assert!(h.stored().await.is_empty());
    }

    #[tokio::test]
    async fn test_read_operations() {
        let h = harness(MockCluster::completing_after(0), Topology::default()).await;
        h.run(request()).await;

        let listed = h
            .provisioner
            .list_storage(&h.cluster_id.to_string())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let fetched = h
            .provisioner
            .get_storage(&listed[0].storage_id.to_string())
            .await
            .unwrap();
        assert_eq!(fetched.as_ref().map(|s| s.storage_id), Some(listed[0].storage_id));

        assert!(h.provisioner.get_storage("nope").await.is_err());
    }
}
