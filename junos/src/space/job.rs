//! Asynchronous Junos Space jobs.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use log::debug;

use crate::error::Result;

/// Progress of a Space job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Scheduled,
    InProgress { percent: u8 },
    Succeeded,
    Failed { summary: String },
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed { .. } | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Scheduled => f.write_str("scheduled"),
            JobStatus::InProgress { percent } => write!(f, "in progress ({percent}%)"),
            JobStatus::Succeeded => f.write_str("succeeded"),
            JobStatus::Failed { summary } => write!(f, "failed: {summary}"),
            JobStatus::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Anything that can report the status of a job.
pub trait JobPoller: Send + Sync {
    fn job_status(&self, job: Job) -> impl Future<Output = Result<JobStatus>> + Send;
}

/// Handle to a job started on the Space server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Job {
    pub id: u64,
}

impl Job {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// Poll until the job reaches a terminal status.
    pub async fn wait<P: JobPoller>(self, poller: &P, interval: Duration) -> Result<JobStatus> {
        loop {
            let status = poller.job_status(self).await?;
            debug!("job {}: {}", self.id, status);
            if status.is_terminal() {
                return Ok(status);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<JobStatus>>);

    impl JobPoller for Scripted {
        async fn job_status(&self, _job: Job) -> Result<JobStatus> {
            let mut statuses = self.0.lock().unwrap();
            Ok(statuses.remove(0))
        }
    }

    #[test]
    fn test_wait_polls_until_terminal() {
        let poller = Scripted(Mutex::new(vec![
            JobStatus::Scheduled,
            JobStatus::InProgress { percent: 40 },
            JobStatus::Succeeded,
            JobStatus::Scheduled,
        ]));

        let status =
            tokio_test::block_on(Job::new(7).wait(&poller, Duration::from_millis(1))).unwrap();
        assert_eq!(status, JobStatus::Succeeded);
        assert_eq!(poller.0.lock().unwrap().len(), 1);
    }
}
