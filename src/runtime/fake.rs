// ABOUTME: Scripted in-memory runtime used by unit tests.
// ABOUTME: Records every call and fails on demand at a chosen step.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    ArchiveReader, ContainerConfig, ContainerError, ContainerInfo, ContainerOps, CopyError,
    CopyOps, MountPoint, OutputSink, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::types::{ContainerId, ImageId};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Runtime call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Info,
    Inspect,
    Create,
    Copy,
    Run,
    Remove,
}

/// An archive received through `copy_to_container`.
#[derive(Debug, Clone)]
pub(crate) struct Copied {
    pub container: ContainerId,
    pub path: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Step>,
    created: Vec<ContainerConfig>,
    copies: Vec<Copied>,
    removed: Vec<(ContainerId, bool)>,
}

pub(crate) struct FakeRuntime {
    os_type: String,
    image: String,
    mounts: Vec<MountPoint>,
    fail_at: Option<Step>,
    exit_code: i64,
    stderr_output: Vec<u8>,
    run_delay: Option<Duration>,
    create_delay: Option<Duration>,
    state: Mutex<State>,
}

impl FakeRuntime {
    pub fn linux() -> Self {
        Self {
            os_type: "linux".to_string(),
            image: "sha256:builder".to_string(),
            mounts: Vec::new(),
            fail_at: None,
            exit_code: 0,
            stderr_output: Vec::new(),
            run_delay: None,
            create_delay: None,
            state: Mutex::new(State::default()),
        }
    }

    pub fn windows(mounts: Vec<MountPoint>) -> Self {
        Self {
            os_type: "windows".to_string(),
            mounts,
            ..Self::linux()
        }
    }

    pub fn failing_at(mut self, step: Step) -> Self {
        self.fail_at = Some(step);
        self
    }

    pub fn with_exit(mut self, code: i64, stderr: &[u8]) -> Self {
        self.exit_code = code;
        self.stderr_output = stderr.to_vec();
        self
    }

    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = Some(delay);
        self
    }

    /// The helper exists on the engine as soon as creation starts; the
    /// delay only holds back the returned id.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Step> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn created(&self) -> Vec<ContainerConfig> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn copies(&self) -> Vec<Copied> {
        self.state.lock().unwrap().copies.clone()
    }

    pub fn removed(&self) -> Vec<(ContainerId, bool)> {
        self.state.lock().unwrap().removed.clone()
    }

    fn record(&self, step: Step) -> bool {
        self.state.lock().unwrap().calls.push(step);
        self.fail_at == Some(step)
    }
}

pub(crate) fn mount(name: &str, destination: &str) -> MountPoint {
    MountPoint {
        name: name.to_string(),
        source: format!(r"C:\ProgramData\docker\volumes\{name}\_data"),
        destination: destination.to_string(),
        driver: Some("local".to_string()),
        rw: true,
    }
}

impl Sealed for FakeRuntime {}

#[async_trait]
impl RuntimeInfo for FakeRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        if self.record(Step::Info) {
            return Err(RuntimeInfoError::ConnectionFailed("engine unreachable".into()));
        }
        Ok(RuntimeMetadata {
            name: "Docker".to_string(),
            version: "27.0.0".to_string(),
            api_version: "1.47".to_string(),
            os: "fake".to_string(),
            os_type: self.os_type.clone(),
            arch: "x86_64".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        if self.record(Step::Create) {
            return Err(ContainerError::ImageNotFound(config.image.to_string()));
        }
        let id = {
            let mut state = self.state.lock().unwrap();
            state.created.push(config.clone());
            ContainerId::new(format!("helper-{}", state.created.len()))
        };
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(id)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let fail = self.record(Step::Remove);
        self.state
            .lock()
            .unwrap()
            .removed
            .push((id.clone(), force));
        if fail {
            return Err(ContainerError::Runtime("removal in progress".into()));
        }
        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        if self.record(Step::Inspect) {
            return Err(ContainerError::NotFound(id.to_string()));
        }
        Ok(ContainerInfo {
            id: id.clone(),
            name: "builder".to_string(),
            image: ImageId::new(self.image.clone()),
            mounts: self.mounts.clone(),
        })
    }

    async fn run_container(
        &self,
        _id: &ContainerId,
        stdout: &mut OutputSink,
        stderr: &mut OutputSink,
    ) -> Result<i64, ContainerError> {
        if self.record(Step::Run) {
            return Err(ContainerError::Runtime("start failed".into()));
        }
        if let Some(delay) = self.run_delay {
            tokio::time::sleep(delay).await;
        }
        stdout.write_all(b"1 File(s) copied\r\n").await?;
        stderr.write_all(&self.stderr_output).await?;
        Ok(self.exit_code)
    }
}

#[async_trait]
impl CopyOps for FakeRuntime {
    async fn copy_to_container(
        &self,
        id: &ContainerId,
        path: &str,
        mut archive: ArchiveReader,
    ) -> Result<(), CopyError> {
        if self.record(Step::Copy) {
            return Err(CopyError::NotFound(path.to_string()));
        }
        let mut bytes = Vec::new();
        archive.read_to_end(&mut bytes).await?;
        self.state.lock().unwrap().copies.push(Copied {
            container: id.clone(),
            path: path.to_string(),
            bytes,
        });
        Ok(())
    }
}
