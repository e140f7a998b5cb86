//! # Fanout
//!
//! 有界并发的 fan-out/fan-in 引擎。
//!
//! 负责：
//! - 将任务逐个交给固定数量的 worker（会合式交接）
//! - 为每个任务解析执行上下文（共享上下文或单任务超时）
//! - 在调用方任务上为每个任务收集恰好一个结果
//! - 将所有失败交给调用方的错误处理器
//!
//! ```no_run
//! use std::num::NonZeroUsize;
//! use std::time::Duration;
//! use fanout::{Fanout, FanoutError, Job, JobMeta};
//!
//! # async fn demo() {
//! let mut fanout = Fanout::new(|err: FanoutError| eprintln!("{err}"));
//! let jobs = vec![Job::new("a"), Job::new("b")];
//! let parallelism = NonZeroUsize::new(2).unwrap();
//!
//! fanout
//!     .fanout(None, Some(Duration::from_secs(5)), jobs, parallelism, |ctx, job| async move {
//!         ctx.run(async { println!("running {}", job.meta()) })
//!             .await
//!             .map_err(|e| e.to_string())
//!     })
//!     .await;
//! # }
//! ```

mod collector;
pub mod context;
mod dispatcher;
pub mod engine;
pub mod error;
mod handoff;
pub mod metrics;
mod worker;

pub use contracts::{ContextError, ExecutionContext, FanoutOptions, Job, JobMeta};
pub use context::{ContextPolicy, ResolvedContext};
pub use engine::{ErrorHandler, Fanout};
pub use error::{BoxError, FanoutError};
pub use metrics::{FanoutMetrics, MetricsSnapshot};
