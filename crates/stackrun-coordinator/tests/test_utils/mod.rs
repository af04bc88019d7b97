//! Shared test utilities for integration tests
//!
//! An in-memory stand-in for CloudFormation, S3, and the monitoring services.
//! Stack statuses advance one step per `describe_stack`, which is what the
//! poller sees between sleeps.

#![allow(dead_code)]

use anyhow::{Result, anyhow, bail};
use stackrun_common::defaults::MAX_DELETE_BATCH;
use stackrun_common::resource_kind::S3_BUCKET_TYPE;
use stackrun_common::{Namespace, OrphanKind, Redacted, StackStatus};
use stackrun_coordinator::aws::cloudformation::{
    ChildResource, CreateStackRequest, Export, StackDescription, StackEvent, StackOutput,
    TemplateValidation,
};
use stackrun_coordinator::aws::s3::{
    BatchDeleteOutcome, ObjectVersionRef, VersionCursor, VersionPage,
};
use stackrun_coordinator::aws::{BucketOperations, OrphanOperations, StackOperations};
use stackrun_coordinator::config::{
    AwsConfig, DatabaseConfig, DeployConfig, EnvironmentConfig, MonitoringConfig, PollConfig,
};
use stackrun_coordinator::orchestrator::environment::ROLES;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

pub const ACCOUNT_ID: &str = "123456789012";

/// Every remote call the fake receives, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Describe(String),
    Validate,
    Create(String),
    Delete(String),
    ListExports,
    ListEvents(String),
    ListChildren(String),
    EnsureBucket(String),
    Upload { bucket: String, key: String },
    RemoveCurrent(String),
    ListVersions(String),
    DeleteBatch { bucket: String, size: usize },
    DeleteBucket(String),
    ListOrphans(OrphanKind),
    DeleteOrphan(OrphanKind, String),
}

/// What the fake knew when a create call arrived
#[derive(Debug, Clone)]
pub struct CreateRecord {
    pub name: String,
    pub parameters: Vec<(String, String)>,
    /// Status of every other stack at that moment
    pub others: HashMap<String, StackStatus>,
}

#[derive(Debug, Clone)]
struct FakeStack {
    status: StackStatus,
    /// Statuses reported by the following describes, one per call
    script: VecDeque<StackStatus>,
    outputs: Vec<StackOutput>,
}

/// Versioned bucket: entries sorted by (key, version id)
#[derive(Debug, Clone, Default)]
pub struct FakeBucket {
    entries: BTreeMap<(String, String), bool>,
    next_version: u64,
}

impl FakeBucket {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn put(&mut self, key: &str, delete_marker: bool) {
        self.next_version += 1;
        self.entries
            .insert((key.to_string(), format!("v{:08}", self.next_version)), delete_marker);
    }

    /// Keys whose newest entry is a live object
    fn current_keys(&self) -> Vec<String> {
        // Versions sort in creation order, so the last one per key wins
        let mut latest: BTreeMap<&str, bool> = BTreeMap::new();
        for ((key, _), marker) in &self.entries {
            latest.insert(key.as_str(), *marker);
        }
        latest
            .into_iter()
            .filter(|(_, marker)| !marker)
            .map(|(key, _)| key.to_string())
            .collect()
    }
}

#[derive(Default)]
struct State {
    stacks: HashMap<String, FakeStack>,
    calls: Vec<Call>,
    creates: Vec<CreateRecord>,
    create_scripts: HashMap<String, Vec<StackStatus>>,
    delete_scripts: HashMap<String, Vec<StackStatus>>,
    outputs_on_create: HashMap<String, Vec<StackOutput>>,
    children: HashMap<String, Vec<ChildResource>>,
    unlistable: HashSet<String>,
    buckets: HashMap<String, FakeBucket>,
    orphans: HashMap<OrphanKind, Vec<String>>,
    page_size: usize,
    uploads: Vec<(String, String, Vec<u8>)>,
}

/// In-memory cloud implementing every operation trait
pub struct FakeCloud {
    state: Mutex<State>,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                page_size: 1000,
                ..Default::default()
            }),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    // --- setup ---

    /// An existing stack in `status`, with outputs
    pub fn seed_stack(&self, name: &str, status: StackStatus, outputs: &[(&str, &str)]) {
        self.with(|s| {
            s.stacks.insert(
                name.to_string(),
                FakeStack {
                    status,
                    script: VecDeque::new(),
                    outputs: make_outputs(name, outputs),
                },
            );
        });
    }

    /// Statuses a newly created stack goes through (default: `CREATE_COMPLETE`)
    pub fn on_create(&self, name: &str, statuses: &[StackStatus]) {
        self.with(|s| s.create_scripts.insert(name.to_string(), statuses.to_vec()));
    }

    /// Statuses a deleting stack goes through (default: `DELETE_COMPLETE`)
    pub fn on_delete(&self, name: &str, statuses: &[StackStatus]) {
        self.with(|s| s.delete_scripts.insert(name.to_string(), statuses.to_vec()));
    }

    /// Outputs a stack publishes once created
    pub fn outputs_for(&self, name: &str, outputs: &[(&str, &str)]) {
        self.with(|s| {
            s.outputs_on_create
                .insert(name.to_string(), make_outputs(name, outputs));
        });
    }

    /// A bucket owned by `stack`
    pub fn attach_bucket(&self, stack: &str, bucket: &str) {
        self.with(|s| {
            s.children.entry(stack.to_string()).or_default().push(ChildResource {
                resource_type: S3_BUCKET_TYPE.to_string(),
                logical_id: "LogBucket".to_string(),
                physical_id: Some(bucket.to_string()),
            });
            s.buckets.entry(bucket.to_string()).or_default();
        });
    }

    /// Make listing the resources of `stack` fail
    pub fn fail_listing(&self, stack: &str) {
        self.with(|s| s.unlistable.insert(stack.to_string()));
    }

    /// Fill a bucket: `keys` objects with `versions` versions each, every
    /// other key ending in a delete marker
    pub fn fill_bucket(&self, bucket: &str, keys: usize, versions: usize) {
        self.with(|s| {
            let b = s.buckets.entry(bucket.to_string()).or_default();
            for k in 0..keys {
                let key = format!("logs/{k:06}.json");
                for _ in 0..versions {
                    b.put(&key, false);
                }
                if k % 2 == 1 {
                    b.put(&key, true);
                }
            }
        });
    }

    pub fn set_page_size(&self, size: usize) {
        self.with(|s| s.page_size = size);
    }

    pub fn add_orphans(&self, kind: OrphanKind, names: &[&str]) {
        self.with(|s| {
            s.orphans
                .entry(kind)
                .or_default()
                .extend(names.iter().map(|n| n.to_string()));
        });
    }

    // --- inspection ---

    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    pub fn creates(&self) -> Vec<CreateRecord> {
        self.with(|s| s.creates.clone())
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create(_)))
            .count()
    }

    /// Stack names in the order delete was requested
    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DeleteBatch { size, .. } => Some(size),
                _ => None,
            })
            .collect()
    }

    pub fn stack_status(&self, name: &str) -> Option<StackStatus> {
        self.with(|s| s.stacks.get(name).map(|st| st.status.clone()))
    }

    pub fn bucket_len(&self, bucket: &str) -> Option<usize> {
        self.with(|s| s.buckets.get(bucket).map(FakeBucket::len))
    }

    pub fn orphans(&self, kind: OrphanKind) -> Vec<String> {
        self.with(|s| s.orphans.get(&kind).cloned().unwrap_or_default())
    }

    pub fn uploads(&self) -> Vec<(String, String, Vec<u8>)> {
        self.with(|s| s.uploads.clone())
    }
}

fn make_outputs(stack: &str, outputs: &[(&str, &str)]) -> Vec<StackOutput> {
    outputs
        .iter()
        .map(|(key, value)| StackOutput {
            key: key.to_string(),
            value: value.to_string(),
            export_name: Some(format!("{stack}-{key}")),
        })
        .collect()
}

impl StackOperations for FakeCloud {
    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>> {
        self.with(|s| {
            s.calls.push(Call::Describe(name.to_string()));
            let Some(stack) = s.stacks.get_mut(name) else {
                return Ok(None);
            };
            if let Some(next) = stack.script.pop_front() {
                stack.status = next;
            }
            if stack.status == StackStatus::DeleteComplete {
                s.stacks.remove(name);
                return Ok(None);
            }
            let outputs = if stack.status.is_success() {
                stack.outputs.clone()
            } else {
                Vec::new()
            };
            Ok(Some(StackDescription {
                name: name.to_string(),
                stack_id: Some(format!("arn:aws:cloudformation:us-east-1:{ACCOUNT_ID}:stack/{name}")),
                status: stack.status.clone(),
                status_reason: None,
                outputs,
            }))
        })
    }

    async fn validate_template(&self, template_body: &str) -> Result<TemplateValidation> {
        self.with(|s| s.calls.push(Call::Validate));
        if template_body.contains("INVALID") {
            return Ok(TemplateValidation::Invalid(
                "Template format error: unsupported structure".to_string(),
            ));
        }
        Ok(TemplateValidation::Valid)
    }

    async fn create_stack(&self, request: CreateStackRequest) -> Result<String> {
        self.with(|s| {
            s.calls.push(Call::Create(request.name.clone()));
            if s.stacks.contains_key(&request.name) {
                bail!("AlreadyExistsException: Stack [{}] already exists", request.name);
            }
            s.creates.push(CreateRecord {
                name: request.name.clone(),
                parameters: request
                    .parameters
                    .iter()
                    .map(|p| (p.key.clone(), p.value().to_string()))
                    .collect(),
                others: s
                    .stacks
                    .iter()
                    .map(|(n, st)| (n.clone(), st.status.clone()))
                    .collect(),
            });
            let script = s
                .create_scripts
                .get(&request.name)
                .cloned()
                .unwrap_or_else(|| vec![StackStatus::CreateComplete]);
            let outputs = s
                .outputs_on_create
                .get(&request.name)
                .cloned()
                .unwrap_or_default();
            s.stacks.insert(
                request.name.clone(),
                FakeStack {
                    status: StackStatus::CreateInProgress,
                    script: script.into(),
                    outputs,
                },
            );
            Ok(format!("arn:aws:cloudformation:us-east-1:{ACCOUNT_ID}:stack/{}", request.name))
        })
    }

    async fn delete_stack(&self, name: &str) -> Result<()> {
        self.with(|s| {
            s.calls.push(Call::Delete(name.to_string()));
            // A stack whose buckets still hold data cannot be deleted
            let blocked = s.children.get(name).is_some_and(|children| {
                children.iter().any(|c| {
                    c.physical_id
                        .as_ref()
                        .and_then(|b| s.buckets.get(b))
                        .is_some_and(|b| !b.is_empty())
                })
            });
            let script = if blocked {
                vec![StackStatus::DeleteFailed]
            } else {
                s.delete_scripts
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| vec![StackStatus::DeleteComplete])
            };
            if let Some(stack) = s.stacks.get_mut(name) {
                stack.status = StackStatus::DeleteInProgress;
                stack.script = script.into();
            }
            Ok(())
        })
    }

    async fn list_exports(&self) -> Result<Vec<Export>> {
        self.with(|s| {
            s.calls.push(Call::ListExports);
            Ok(s.stacks
                .values()
                .filter(|st| st.status.is_success())
                .flat_map(|st| st.outputs.iter())
                .filter_map(|o| {
                    Some(Export {
                        name: o.export_name.clone()?,
                        value: o.value.clone(),
                    })
                })
                .collect())
        })
    }

    async fn list_events(&self, name: &str, limit: usize) -> Result<Vec<StackEvent>> {
        self.with(|s| {
            s.calls.push(Call::ListEvents(name.to_string()));
            let status = s.stacks.get(name).map(|st| st.status.to_string());
            Ok(std::iter::once(StackEvent {
                timestamp: None,
                logical_id: Some(name.to_string()),
                resource_type: Some("AWS::CloudFormation::Stack".to_string()),
                resource_status: status,
                physical_id: None,
                reason: Some("simulated failure".to_string()),
            })
            .take(limit)
            .collect())
        })
    }

    async fn list_child_resources(&self, name: &str) -> Result<Vec<ChildResource>> {
        self.with(|s| {
            s.calls.push(Call::ListChildren(name.to_string()));
            if s.unlistable.contains(name) {
                bail!("AccessDenied: not authorized to perform ListStackResources on {name}");
            }
            Ok(s.children.get(name).cloned().unwrap_or_default())
        })
    }
}

impl BucketOperations for FakeCloud {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        self.with(|s| {
            s.calls.push(Call::EnsureBucket(bucket.to_string()));
            s.buckets.entry(bucket.to_string()).or_default();
            Ok(())
        })
    }

    async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        self.with(|s| {
            s.calls.push(Call::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
            let b = s
                .buckets
                .get_mut(bucket)
                .ok_or_else(|| anyhow!("NoSuchBucket: {bucket}"))?;
            b.put(key, false);
            s.uploads.push((bucket.to_string(), key.to_string(), data));
            Ok(())
        })
    }

    async fn remove_current_objects(&self, bucket: &str) -> Result<BatchDeleteOutcome> {
        self.with(|s| {
            s.calls.push(Call::RemoveCurrent(bucket.to_string()));
            let b = s
                .buckets
                .get_mut(bucket)
                .ok_or_else(|| anyhow!("NoSuchBucket: {bucket}"))?;
            // Versioned: deleting a current object only adds a marker
            let keys = b.current_keys();
            for key in &keys {
                b.put(key, true);
            }
            Ok(BatchDeleteOutcome {
                deleted: keys.len(),
                errors: Vec::new(),
            })
        })
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        cursor: &VersionCursor,
    ) -> Result<VersionPage> {
        self.with(|s| {
            s.calls.push(Call::ListVersions(bucket.to_string()));
            let page_size = s.page_size;
            let b = s
                .buckets
                .get(bucket)
                .ok_or_else(|| anyhow!("NoSuchBucket: {bucket}"))?;

            let after = match (&cursor.key_marker, &cursor.version_id_marker) {
                (Some(k), Some(v)) => Some((k.clone(), v.clone())),
                _ => None,
            };
            let mut remaining = b
                .entries
                .iter()
                .filter(|(pos, _)| after.as_ref().is_none_or(|a| *pos > a));

            let entries: Vec<ObjectVersionRef> = remaining
                .by_ref()
                .take(page_size)
                .map(|((key, version), marker)| ObjectVersionRef {
                    key: key.clone(),
                    version_id: Some(version.clone()),
                    delete_marker: *marker,
                })
                .collect();
            let more = remaining.next().is_some();

            let next = match entries.last() {
                Some(last) if more => Some(VersionCursor {
                    key_marker: Some(last.key.clone()),
                    version_id_marker: last.version_id.clone(),
                }),
                _ => None,
            };
            Ok(VersionPage { entries, next })
        })
    }

    async fn delete_object_batch(
        &self,
        bucket: &str,
        entries: Vec<ObjectVersionRef>,
    ) -> Result<BatchDeleteOutcome> {
        self.with(|s| {
            s.calls.push(Call::DeleteBatch {
                bucket: bucket.to_string(),
                size: entries.len(),
            });
            if entries.len() > MAX_DELETE_BATCH {
                bail!("MalformedXML: more than {MAX_DELETE_BATCH} keys");
            }
            let b = s
                .buckets
                .get_mut(bucket)
                .ok_or_else(|| anyhow!("NoSuchBucket: {bucket}"))?;
            let mut deleted = 0;
            for entry in entries {
                match entry.version_id {
                    Some(version) => {
                        b.entries.remove(&(entry.key, version));
                    }
                    None => b.put(&entry.key, true),
                }
                deleted += 1;
            }
            Ok(BatchDeleteOutcome {
                deleted,
                errors: vec![],
            })
        })
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.with(|s| {
            s.calls.push(Call::DeleteBucket(bucket.to_string()));
            match s.buckets.get(bucket) {
                None => bail!("NoSuchBucket: {bucket}"),
                Some(b) if !b.is_empty() => bail!("BucketNotEmpty: {bucket}"),
                Some(_) => {
                    s.buckets.remove(bucket);
                    Ok(())
                }
            }
        })
    }
}

impl OrphanOperations for FakeCloud {
    async fn list_names(&self, kind: OrphanKind) -> Result<Vec<String>> {
        self.with(|s| {
            s.calls.push(Call::ListOrphans(kind));
            Ok(s.orphans.get(&kind).cloned().unwrap_or_default())
        })
    }

    async fn delete(&self, kind: OrphanKind, name: &str) -> Result<()> {
        self.with(|s| {
            s.calls.push(Call::DeleteOrphan(kind, name.to_string()));
            let names = s.orphans.entry(kind).or_default();
            let before = names.len();
            names.retain(|n| n != name);
            if names.len() == before {
                bail!("ResourceNotFoundException: {name}");
            }
            Ok(())
        })
    }
}

// --- environment fixtures ---

/// Outputs each role of the environment publishes
pub fn role_outputs(role: &str) -> Vec<(&'static str, &'static str)> {
    match role {
        "vpc" => vec![
            ("VpcId", "vpc-0abc"),
            ("PublicSubnetId", "subnet-pub"),
            ("PrivateSubnetIds", "subnet-a,subnet-b"),
        ],
        "s3" => vec![
            ("LogBucketName", "proj-dev-logs"),
            ("LogBucketArn", "arn:aws:s3:::proj-dev-logs"),
        ],
        "iam" => vec![
            ("InstanceProfileName", "proj-dev-web"),
            ("LambdaRoleArn", "arn:aws:iam::123456789012:role/proj-dev-lambda"),
        ],
        "ec2" => vec![
            ("InstanceId", "i-0123456789"),
            ("SecurityGroupId", "sg-0app"),
            ("PublicIp", "203.0.113.10"),
        ],
        "rds" => vec![
            ("DbInstanceId", "proj-dev-db"),
            ("DbEndpoint", "proj-dev-db.example.us-east-1.rds.amazonaws.com"),
        ],
        "lambda" => vec![("FunctionName", "proj-dev-status-logger")],
        "cloudwatch" => vec![(
            "AlarmTopicArn",
            "arn:aws:sns:us-east-1:123456789012:proj-dev-alarms",
        )],
        "dashboard" => vec![("DashboardUrl", "https://console.aws.amazon.com/cloudwatch")],
        _ => vec![],
    }
}

pub fn namespace() -> Namespace {
    Namespace::new("proj", "dev").unwrap()
}

/// Register create-time outputs for every role of the environment
pub fn expect_environment_outputs(cloud: &FakeCloud, ns: &Namespace) {
    for role in ROLES {
        cloud.outputs_for(&ns.unit_name(role), &role_outputs(role));
    }
}

/// Every stack of the environment already complete, with outputs
pub fn seed_complete_environment(cloud: &FakeCloud, ns: &Namespace) {
    for role in ROLES {
        cloud.seed_stack(
            &ns.unit_name(role),
            StackStatus::CreateComplete,
            &role_outputs(role),
        );
    }
}

/// Write a template per role and a Lambda source file under `dir`
pub fn write_sources(dir: &Path) {
    let templates = dir.join("templates");
    std::fs::create_dir_all(&templates).unwrap();
    for role in ROLES {
        std::fs::write(
            templates.join(format!("{role}.yaml")),
            format!("Description: {role} stack\nResources: {{}}\n"),
        )
        .unwrap();
    }
    let lambda = dir.join("lambda");
    std::fs::create_dir_all(&lambda).unwrap();
    std::fs::write(
        lambda.join("handler.py"),
        "def lambda_handler(event, context):\n    return {'statusCode': 200}\n",
    )
    .unwrap();
}

pub fn deploy_config(dir: &Path) -> DeployConfig {
    DeployConfig {
        aws: AwsConfig::default(),
        environment: EnvironmentConfig {
            namespace: namespace(),
            templates_dir: dir.join("templates"),
            lambda_source: dir.join("lambda"),
        },
        database: DatabaseConfig {
            username: "admin".to_string(),
            password: Redacted::new("Sup3rSecret!"),
        },
        monitoring: MonitoringConfig::new("ops@example.com"),
        poll: fast_poll(),
        output: None,
    }
}

/// Short cadence for paused-time tests
pub fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_secs(1),
        max_wait: Duration::from_secs(30),
        event_limit: 5,
    }
}
