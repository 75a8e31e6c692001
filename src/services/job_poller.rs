//! 后台任务轮询 - 业务能力层
//!
//! 固定间隔（可选退避）查询任务状态，直到完成、失败、超时或被取消。
//! 等待通过 `Sleeper` 注入，测试不需要真实时钟。

use crate::error::ApiResult;
use crate::models::JobStatus;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 等待能力
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// 基于 tokio 定时器的实现
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl<T: Sleeper + ?Sized> Sleeper for Arc<T> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

/// 轮询策略
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// 首次等待间隔
    pub interval: Duration,
    /// 最多查询次数
    pub max_attempts: u32,
    /// 每次等待后间隔乘以该系数（1.0 表示固定间隔）
    pub backoff: f64,
    /// 单次间隔上限
    pub max_interval: Duration,
    /// 累计等待上限
    pub max_duration: Option<Duration>,
}

impl Default for PollPolicy {
    /// 每 5 秒一次，最多 60 次（约 5 分钟）
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
            backoff: 1.0,
            max_interval: Duration::from_secs(60),
            max_duration: None,
        }
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            ..Self::default()
        }
    }

    fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff <= 1.0 {
            return current;
        }
        current.mul_f64(self.backoff).min(self.max_interval)
    }
}

/// 轮询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { attempts: u32 },
    Failed { attempts: u32, reason: Option<String> },
    TimedOut { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl PollOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PollOutcome::Completed { .. })
    }

    /// 非完成状态的描述，用于警告信息
    pub fn describe(&self) -> String {
        match self {
            PollOutcome::Completed { attempts } => format!("completed ({} 次查询)", attempts),
            PollOutcome::Failed { reason, .. } => {
                format!("failed: {}", reason.as_deref().unwrap_or("未知原因"))
            }
            PollOutcome::TimedOut { attempts } => format!("timeout ({} 次查询后仍未完成)", attempts),
            PollOutcome::Cancelled { attempts } => format!("cancelled (第 {} 次查询后取消)", attempts),
        }
    }
}

/// 任务轮询器
pub struct JobPoller<S: Sleeper = TokioSleeper> {
    policy: PollPolicy,
    sleeper: S,
}

impl JobPoller<TokioSleeper> {
    pub fn new(policy: PollPolicy) -> Self {
        Self::with_sleeper(policy, TokioSleeper)
    }
}

impl<S: Sleeper> JobPoller<S> {
    pub fn with_sleeper(policy: PollPolicy, sleeper: S) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// 轮询直到终态
    ///
    /// `check` 每次查询调用一次，参数是第几次（从1开始）。查询本身出错时记录并继续，
    /// 算作一次尝试。
    pub async fn poll<F, Fut>(&self, mut check: F, cancel: &CancellationToken) -> PollOutcome
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ApiResult<JobStatus>>,
    {
        let mut interval = self.policy.interval;
        let mut waited = Duration::ZERO;

        for attempt in 1..=self.policy.max_attempts {
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled { attempts: attempt - 1 };
            }

            match check(attempt).await {
                Ok(JobStatus::Completed) => {
                    info!("✓ 后台任务完成 (第 {} 次查询)", attempt);
                    return PollOutcome::Completed { attempts: attempt };
                }
                Ok(JobStatus::Failed(reason)) => {
                    warn!("⚠️ 后台任务失败: {:?}", reason);
                    return PollOutcome::Failed {
                        attempts: attempt,
                        reason,
                    };
                }
                Ok(JobStatus::Processing) => {
                    debug!("后台任务处理中 ({}/{})", attempt, self.policy.max_attempts);
                }
                Err(e) => {
                    warn!("⚠️ 查询任务状态失败 ({}/{}): {}", attempt, self.policy.max_attempts, e);
                }
            }

            if attempt == self.policy.max_attempts {
                break;
            }

            if let Some(limit) = self.policy.max_duration {
                if waited + interval > limit {
                    warn!("⚠️ 轮询累计等待将超过 {:?}，停止", limit);
                    return PollOutcome::TimedOut { attempts: attempt };
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("轮询已取消");
                    return PollOutcome::Cancelled { attempts: attempt };
                }
                _ = self.sleeper.sleep(interval) => {}
            }

            waited += interval;
            interval = self.policy.next_interval(interval);
        }

        PollOutcome::TimedOut {
            attempts: self.policy.max_attempts,
        }
    }
}
