use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// 依序執行 extract → transform → load
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&mut self) -> Result<P::Report> {
        let name = self.pipeline.name().to_string();
        println!("Starting {}...", name);
        tracing::info!("🚀 Starting {}", name);

        println!("Extracting data...");
        let raw_data = self.pipeline.extract().await?;
        self.monitor.log_phase("Extract");

        println!("Transforming data...");
        let transformed = self.pipeline.transform(raw_data).await?;
        self.monitor.log_phase("Transform");

        println!("Loading data...");
        let report = self.pipeline.load(transformed).await?;
        self.monitor.log_phase("Load");

        self.monitor.log_final();
        tracing::info!("✅ {} finished", name);
        Ok(report)
    }
}
