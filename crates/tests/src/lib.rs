//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - Fan-out 场景（成功、失败、无效上下文）
//! - 上下文解析属性
//! - Manifest -> 引擎的完整运行

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod scenario_tests {
    use std::collections::HashSet;
    use std::num::NonZeroUsize;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use fanout::{BoxError, ExecutionContext, Fanout, FanoutError, Job};

    fn jobs(count: usize) -> Vec<Job> {
        (0..count).map(|i| Job::new(format!("job-{i}"))).collect()
    }

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    /// 运行 `count` 个任务，每个任务将 meta 追加到共享列表。
    /// 返回 (副作用, 错误)。
    async fn run_recording(
        count: usize,
        parallelism: usize,
        shared: Option<&ExecutionContext>,
        timeout: Option<Duration>,
    ) -> (Vec<String>, Vec<FanoutError>) {
        let effects = Arc::new(Mutex::new(Vec::new()));
        let mut errors = Vec::new();
        let mut fanout = Fanout::new(|err: FanoutError| errors.push(err));

        let recorded = Arc::clone(&effects);
        fanout
            .fanout(shared, timeout, jobs(count), nz(parallelism), move |_ctx, job: Job| {
                let recorded = Arc::clone(&recorded);
                async move {
                    recorded.lock().unwrap().push(job.meta);
                    Ok::<(), BoxError>(())
                }
            })
            .await;
        drop(fanout);

        let effects = effects.lock().unwrap().clone();
        (effects, errors)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_job_success() {
        let ctx = ExecutionContext::new();
        let (effects, errors) = run_recording(1, 1, Some(&ctx), None).await;

        assert!(errors.is_empty());
        assert_eq!(effects, vec!["job-0".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_job_failure() {
        let mut errors = Vec::new();
        let mut fanout = Fanout::new(|err: FanoutError| errors.push(err));

        fanout
            .fanout(
                Some(&ExecutionContext::new()),
                None,
                vec![Job::new("X")],
                nz(1),
                |_ctx, job: Job| async move { Err::<(), String>(format!("job failed {}", job.meta)) },
            )
            .await;
        drop(fanout);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_worker_failure());
        assert_eq!(errors[0].meta(), "X");
        assert!(errors[0].to_string().contains("job failed X"));

        let source = std::error::Error::source(&errors[0]).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("job failed X"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_more_workers_than_jobs() {
        let ctx = ExecutionContext::new();
        let (effects, errors) = run_recording(2, 50, Some(&ctx), None).await;

        assert!(errors.is_empty());
        assert_eq!(effects.len(), 2);
        let unique: HashSet<_> = effects.iter().collect();
        assert_eq!(unique.len(), 2, "duplicate side effect");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fewer_workers_than_jobs() {
        let ctx = ExecutionContext::new();
        let (effects, errors) = run_recording(100, 50, Some(&ctx), None).await;

        assert!(errors.is_empty());
        assert_eq!(effects.len(), 100);
        let unique: HashSet<_> = effects.iter().collect();
        assert_eq!(unique.len(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_context_never_invokes_worker() {
        let (effects, errors) = run_recording(100, 10, None, None).await;

        assert!(effects.is_empty());
        assert_eq!(errors.len(), 100);
        assert!(errors.iter().all(FanoutError::is_invalid_context));
        assert!(errors[0]
            .to_string()
            .contains("invalid context passed into the fanout function"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_result_count_matches_job_count() {
        for job_count in [0, 1, 7, 32] {
            for parallelism in [1, 4, 32, 64] {
                let (effects, errors) =
                    run_recording(job_count, parallelism, None, Some(Duration::from_secs(5)))
                        .await;
                assert!(errors.is_empty());
                assert_eq!(
                    effects.len(),
                    job_count,
                    "jobs={job_count} parallelism={parallelism}"
                );
            }
        }
    }

    async fn fail_every_fifth(job: Job) -> Result<(), BoxError> {
        let index: usize = job.meta.trim_start_matches("job-").parse()?;
        if index % 5 == 0 {
            return Err(format!("job failed {}", job.meta).into());
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mixed_outcomes_report_only_failures() {
        let mut errors = Vec::new();
        let mut fanout = Fanout::new(|err: FanoutError| errors.push(err));

        fanout
            .fanout(
                None,
                Some(Duration::from_secs(5)),
                jobs(20),
                nz(4),
                |_ctx, job: Job| fail_every_fifth(job),
            )
            .await;
        let snapshot = fanout.metrics().snapshot();
        drop(fanout);

        assert_eq!(errors.len(), 4);
        let failed: HashSet<_> = errors.iter().map(|e| e.meta().to_string()).collect();
        for meta in ["job-0", "job-5", "job-10", "job-15"] {
            assert!(failed.contains(meta), "missing failure for {meta}");
        }
        assert_eq!(snapshot.succeeded, 16);
        assert_eq!(snapshot.failed, 4);
    }
}

#[cfg(test)]
mod context_tests {
    use std::num::NonZeroUsize;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::ContextError;
    use fanout::{BoxError, ExecutionContext, Fanout, FanoutError, Job};
    use tokio::time::{sleep, Instant};

    fn jobs(count: usize) -> Vec<Job> {
        (0..count).map(|i| Job::new(i.to_string())).collect()
    }

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_context_reaches_every_job() {
        let shared = ExecutionContext::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut fanout = Fanout::new(|err: FanoutError| {
            panic!("unexpected error: {err}");
        });

        let recorded = Arc::clone(&seen);
        fanout
            .fanout(
                Some(&shared),
                // ignored when a shared context is supplied
                Some(Duration::from_millis(1)),
                jobs(10),
                nz(3),
                move |ctx: ExecutionContext, _job: Job| {
                    let recorded = Arc::clone(&recorded);
                    async move {
                        recorded.lock().unwrap().push(ctx);
                        Ok::<(), BoxError>(())
                    }
                },
            )
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 10);
        assert!(seen.iter().all(|ctx| ctx.same_as(&shared)));
        assert!(seen.iter().all(|ctx| ctx.deadline().is_none()));
        assert!(!shared.is_done(), "shared context must outlive the call");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_per_job_contexts_are_distinct() {
        let timeout = Duration::from_millis(200);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut fanout = Fanout::new(|err: FanoutError| {
            panic!("unexpected error: {err}");
        });

        let recorded = Arc::clone(&seen);
        fanout
            .fanout(
                None,
                Some(timeout),
                jobs(6),
                nz(1),
                move |ctx: ExecutionContext, _job: Job| {
                    let recorded = Arc::clone(&recorded);
                    async move {
                        let started = Instant::now();
                        let deadline = ctx.deadline();
                        recorded.lock().unwrap().push((ctx.id(), started, deadline));
                        sleep(Duration::from_millis(20)).await;
                        Ok::<(), BoxError>(())
                    }
                },
            )
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 6);

        let mut ids: Vec<u64> = seen.iter().map(|(id, _, _)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 6, "contexts must not be reused");

        // Each deadline is measured from its own job's start, not from the call
        for (_, started, deadline) in seen.iter() {
            let deadline = deadline.expect("per-job context has a deadline");
            assert!(deadline > *started);
            assert!(deadline <= *started + timeout);
        }
        let first = seen[0].2.unwrap();
        let last = seen[5].2.unwrap();
        assert!(last - first >= Duration::from_millis(80));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_per_job_timeout_expires() {
        let mut errors = Vec::new();
        let mut fanout = Fanout::new(|err: FanoutError| errors.push(err));

        fanout
            .fanout(
                None,
                Some(Duration::from_millis(30)),
                jobs(3),
                nz(3),
                |ctx: ExecutionContext, _job: Job| async move {
                    let reason = ctx.done().await;
                    Err::<(), BoxError>(reason.into())
                },
            )
            .await;
        drop(fanout);

        assert_eq!(errors.len(), 3);
        for err in &errors {
            assert!(err
                .to_string()
                .contains(&ContextError::DeadlineExceeded.to_string()));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_per_job_context_released_after_invocation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut fanout = Fanout::new(|err: FanoutError| {
            panic!("unexpected error: {err}");
        });

        let recorded = Arc::clone(&seen);
        fanout
            .fanout(
                None,
                Some(Duration::from_secs(60)),
                jobs(4),
                nz(2),
                move |ctx: ExecutionContext, _job: Job| {
                    let recorded = Arc::clone(&recorded);
                    async move {
                        recorded.lock().unwrap().push(ctx);
                        Ok::<(), BoxError>(())
                    }
                },
            )
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen
            .iter()
            .all(|ctx| ctx.err() == Some(ContextError::Cancelled)));
    }

    async fn cancellable_job(
        ctx: ExecutionContext,
        job: Job,
        started: Arc<Mutex<usize>>,
    ) -> Result<(), BoxError> {
        if let Some(reason) = ctx.err() {
            return Err(reason.into());
        }
        *started.lock().unwrap() += 1;
        if job.meta == "0" {
            return Err("first job failed".into());
        }
        ctx.run(sleep(Duration::from_millis(10))).await?;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_handler_cancels_shared_context() {
        let shared = ExecutionContext::new();
        let cancel = shared.clone();
        let started = Arc::new(Mutex::new(0usize));
        let mut errors = Vec::new();
        let mut fanout = Fanout::new(|err: FanoutError| {
            cancel.cancel();
            errors.push(err);
        });

        let counter = Arc::clone(&started);
        fanout
            .fanout(
                Some(&shared),
                None,
                jobs(20),
                nz(2),
                move |ctx: ExecutionContext, job: Job| {
                    cancellable_job(ctx, job, Arc::clone(&counter))
                },
            )
            .await;
        let snapshot = fanout.metrics().snapshot();
        drop(fanout);

        // Every job still reports, but most never get past the context check
        assert_eq!(snapshot.completed(), 20);
        assert!(errors.iter().any(|e| e.to_string().contains("first job failed")));
        assert!(*started.lock().unwrap() < 20);
        assert!(shared.is_done());
    }
}

#[cfg(test)]
mod panic_tests {
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use fanout::{BoxError, ExecutionContext, Fanout, FanoutError, Job};

    fn maybe_explode(job: &Job) {
        if job.meta == "boom" {
            panic!("exploded on {}", job.meta);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panic_is_reported_and_pool_survives() {
        let mut errors = Vec::new();
        let completed = Arc::new(AtomicUsize::new(0));
        let mut fanout = Fanout::new(|err: FanoutError| errors.push(err));

        let jobs = vec![Job::new("a"), Job::new("boom"), Job::new("b"), Job::new("c")];
        let counter = Arc::clone(&completed);
        fanout
            .fanout(
                Some(&ExecutionContext::new()),
                None,
                jobs,
                NonZeroUsize::new(1).unwrap(),
                move |_ctx, job: Job| {
                    let counter = Arc::clone(&counter);
                    async move {
                        maybe_explode(&job);
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<(), BoxError>(())
                    }
                },
            )
            .await;
        let snapshot = fanout.metrics().snapshot();
        drop(fanout);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_panic());
        assert_eq!(errors[0].meta(), "boom");
        assert!(errors[0].to_string().contains("exploded on boom"));
        assert_eq!(completed.load(Ordering::SeqCst), 3);
        assert_eq!(snapshot.panicked, 1);
        assert_eq!(snapshot.completed(), 4);
    }
}

#[cfg(test)]
mod manifest_tests {
    use std::sync::{Arc, Mutex};

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::CommandJob;
    use fanout::{BoxError, ExecutionContext, Fanout, FanoutError};
    use observability::{JobStatus, RunStats};

    const MANIFEST: &str = r#"
[fanout]
parallelism = 3
timeout_secs = 5

[[jobs]]
meta = "compile"
program = "make"
args = ["all"]

[[jobs]]
meta = "lint"
program = "make"
args = ["lint"]

[[jobs]]
meta = "broken"
program = "make"
args = ["broken"]
"#;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_manifest_drives_engine() {
        let manifest = ConfigLoader::load_from_str(MANIFEST, ConfigFormat::Toml).unwrap();
        let options = manifest.fanout.options().unwrap();
        assert_eq!(options.parallelism.get(), 3);

        let ran = Arc::new(Mutex::new(Vec::new()));
        let mut stats = RunStats::new();
        let mut fanout = Fanout::new(|err: FanoutError| {
            stats.record(err.meta(), JobStatus::from_error(&err), None);
        });

        let recorded = Arc::clone(&ran);
        fanout
            .run(None, &options, manifest.jobs, move |ctx: ExecutionContext, job: CommandJob| {
                let recorded = Arc::clone(&recorded);
                async move {
                    assert!(ctx.deadline().is_some());
                    if job.args.iter().any(|a| a == "broken") {
                        return Err::<(), BoxError>(format!("{} exited with code 2", job.program).into());
                    }
                    recorded.lock().unwrap().push(job.meta);
                    Ok(())
                }
            })
            .await;
        let snapshot = fanout.metrics().snapshot();
        drop(fanout);

        let mut ran = ran.lock().unwrap().clone();
        ran.sort();
        assert_eq!(ran, vec!["compile".to_string(), "lint".to_string()]);
        assert_eq!(stats.count(JobStatus::Failed), 1);
        assert_eq!(snapshot.succeeded, 2);
        assert_eq!(snapshot.dispatched, 3);
    }

    #[tokio::test]
    async fn test_manifest_without_context_reports_invalid() {
        let content = r#"
[fanout]
parallelism = 2

[[jobs]]
meta = "a"
program = "true"

[[jobs]]
meta = "b"
program = "true"
"#;
        let manifest = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        assert!(config_loader::warnings(&manifest)
            .iter()
            .any(|w| w.contains("invalid-context")));

        let options = manifest.fanout.options().unwrap();
        let mut stats = RunStats::new();
        let mut fanout = Fanout::new(|err: FanoutError| {
            stats.record(err.meta(), JobStatus::from_error(&err), None);
        });

        fanout
            .run(None, &options, manifest.jobs, |_ctx, _job: CommandJob| async move {
                Ok::<(), BoxError>(())
            })
            .await;
        drop(fanout);

        assert_eq!(stats.count(JobStatus::InvalidContext), 2);
        assert_eq!(stats.total(), 2);
    }
}
