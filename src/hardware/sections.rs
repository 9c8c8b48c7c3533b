use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sysinfo::{Disks, System};
use tokio::task::spawn_blocking;
use tracing::trace;

use super::Collector;

/// Hostname, memory and operating system
#[derive(Debug, Default)]
pub struct SystemCollector;

impl SystemCollector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Collector for SystemCollector {
    fn target(&self) -> &'static str {
        "system-data"
    }

    async fn collect(&self) -> anyhow::Result<String> {
        spawn_blocking(|| {
            let mut sys = System::new();
            sys.refresh_memory();

            let host_name = System::host_name().unwrap_or_else(|| String::from("unknown"));
            format_system_section(
                &host_name,
                sys.total_memory(),
                sys.used_memory(),
                std::env::consts::OS,
            )
        })
        .await
        .context("system collector task failed")
    }
}

pub fn format_system_section(host_name: &str, total: u64, used: u64, os: &str) -> String {
    format!(
        "Hostname: {host_name}<br>\nTotal Memory: {total}<br>\nUsed Memory: {used}<br>OS: {os}<hr>"
    )
}

/// CPU model, core count and global usage
///
/// Usage is measured between two refreshes, so the collector keeps its
/// `System` across ticks; the first tick reports 0%.
#[derive(Debug, Clone)]
pub struct CpuCollector {
    sys: Arc<Mutex<System>>,
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuCollector {
    pub fn new() -> Self {
        Self {
            sys: Arc::new(Mutex::new(System::new())),
        }
    }
}

#[async_trait]
impl Collector for CpuCollector {
    fn target(&self) -> &'static str {
        "cpu-data"
    }

    async fn collect(&self) -> anyhow::Result<String> {
        let sys = Arc::clone(&self.sys);
        spawn_blocking(move || -> anyhow::Result<String> {
            let mut sys = sys.lock().unwrap_or_else(PoisonError::into_inner);
            sys.refresh_cpu_all();

            let cpus = sys.cpus();
            let first = cpus.first().ok_or_else(|| anyhow!("no CPU information available"))?;
            trace!("read {} cpus", cpus.len());

            Ok(format_cpu_section(
                first.brand(),
                cpus.len(),
                sys.global_cpu_usage(),
            ))
        })
        .await
        .context("cpu collector task failed")?
    }
}

pub fn format_cpu_section(model: &str, cores: usize, usage: f32) -> String {
    format!("CPU: {model}<br>\nCores: {cores}<br>\nUsage: {usage:.1}%<hr>")
}

/// Total and free space of the filesystem holding a path
#[derive(Debug, Clone)]
pub struct DiskCollector {
    path: PathBuf,
}

impl DiskCollector {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Collector for DiskCollector {
    fn target(&self) -> &'static str {
        "disk-data"
    }

    async fn collect(&self) -> anyhow::Result<String> {
        let path = self.path.clone();
        spawn_blocking(move || -> anyhow::Result<String> {
            let disks = Disks::new_with_refreshed_list();
            let index = covering_mount(disks.list().iter().map(|d| d.mount_point()), &path)
                .ok_or_else(|| anyhow!("no disk found for {}", path.display()))?;
            let disk = &disks.list()[index];

            Ok(format_disk_section(disk.total_space(), disk.available_space()))
        })
        .await
        .context("disk collector task failed")?
    }
}

pub fn format_disk_section(total: u64, free: u64) -> String {
    format!("Total Disk Space: {total}<br>\nFree Disk Space: {free}")
}

/// Index of the mount point that is the longest prefix of `path`.
pub fn covering_mount<'a>(
    mount_points: impl IntoIterator<Item = &'a Path>,
    path: &Path,
) -> Option<usize> {
    mount_points
        .into_iter()
        .enumerate()
        .filter(|(_, mount)| path.starts_with(mount))
        .max_by_key(|(_, mount)| mount.components().count())
        .map(|(index, _)| index)
}
