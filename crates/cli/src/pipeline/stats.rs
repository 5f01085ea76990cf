//! Pipeline statistics.

use std::path::PathBuf;
use std::time::Duration;

use delivery::DeliverySnapshot;
use observability::PipelineSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Wall-clock run time
    pub duration: Duration,

    /// Watchers started
    pub sources: usize,

    /// Records still queued at shutdown
    pub pending: usize,

    pub queue_path: PathBuf,

    /// Delivery client counters
    pub delivery: DeliverySnapshot,

    /// Aggregated status events
    pub summary: PipelineSummary,
}

impl PipelineStats {
    /// Share of HTTP attempts that ended in a delivery, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.delivery.attempts > 0 {
            (self.delivery.delivered as f64 / self.delivery.attempts as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!();
        print!("{}", self.summary);

        println!("\nDelivery");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Sources watched: {}", self.sources);
        println!("   ├─ HTTP attempts: {}", self.delivery.attempts);
        println!("   ├─ Delivered: {}", self.delivery.delivered);
        println!(
            "   ├─ Rejected / unreachable attempts: {} / {}",
            self.delivery.rejected, self.delivery.unreachable
        );
        println!("   ├─ Records that exhausted retries: {}", self.delivery.failed);
        println!("   └─ Attempt success rate: {:.1}%", self.success_rate());

        if self.pending > 0 {
            println!(
                "\n⚠ {} records still queued in {}",
                self.pending,
                self.queue_path.display()
            );
        }

        println!();
    }
}
