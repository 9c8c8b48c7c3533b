//! Host metric collectors and payload rendering
//!
//! Each collector produces one HTML fragment for a fixed element id of the
//! dashboard page. The publisher renders all fragments of one tick into a
//! single payload of htmx out-of-band swaps.

pub mod render;
pub mod sections;

pub use render::{Section, TIMESTAMP_TARGET, render_payload};
pub use sections::{CpuCollector, DiskCollector, SystemCollector};

use std::path::Path;

use async_trait::async_trait;

/// Source of one section of the dashboard
#[async_trait]
pub trait Collector: Send + Sync {
    /// Id of the page element this section replaces
    fn target(&self) -> &'static str;

    /// Produce the section's HTML or fail for this tick.
    async fn collect(&self) -> anyhow::Result<String>;
}

/// The system, CPU and disk collectors, in page order.
pub fn default_collectors(disk_path: &Path) -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(SystemCollector::new()),
        Box::new(CpuCollector::new()),
        Box::new(DiskCollector::new(disk_path)),
    ]
}
