//! End-to-end tests spanning the three execution modes.

use super::{AsyncPipelineBuilder, DistributedPipeline, PipelineBuilder};
use crate::context::RunContext;
use crate::endpoint::StageEndpoint;
use crate::stage::{Blocking, FnStage};
use crate::testing::{
    AppendStage, CountingEndpoint, CountingStage, FailStage, SleepStage, UppercaseStage,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

#[test]
fn single_stage_uppercase() {
    let pipeline = PipelineBuilder::new("uppercase")
        .add_stage(UppercaseStage)
        .build();

    assert_eq!(pipeline.execute("test".into()).unwrap(), "TEST");
}

#[test]
fn two_stage_uppercase_then_append() {
    let pipeline = PipelineBuilder::new("uppercase-append")
        .add_stage(UppercaseStage)
        .add_stage(AppendStage::new("123"))
        .build();

    assert_eq!(pipeline.execute("test".into()).unwrap(), "TEST123");
}

#[test]
fn failing_stage_produces_exact_message() {
    let pipeline = PipelineBuilder::new("doomed")
        .add_stage(FailStage::new("ErrorStage", "Intentional error"))
        .build();

    let err = pipeline.execute("anything".into()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed in stage 'ErrorStage': Intentional error"
    );
    assert_eq!(err.stage_name(), Some("ErrorStage"));
}

#[test]
fn execute_is_idempotent_without_shared_state() {
    let pipeline = PipelineBuilder::new("idempotent")
        .add_stage(UppercaseStage)
        .add_stage(AppendStage::new("!"))
        .build();

    let first = pipeline.execute("same".into()).unwrap();
    let second = pipeline.execute("same".into()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, "SAME!");
}

#[test]
fn short_circuit_skips_stages_after_failure() {
    let counter = Arc::new(AtomicUsize::new(0));
    let pipeline = PipelineBuilder::new("short-circuit")
        .add_stage(UppercaseStage)
        .add_stage(FailStage::new("Middle", "halt"))
        .add_stage(CountingStage::new("Tail", Arc::clone(&counter)))
        .build();

    let err = pipeline.execute("input".into()).unwrap_err();
    assert_eq!(err.stage_name(), Some("Middle"));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_and_async_agree_on_same_stages() {
    let sync_pipeline = PipelineBuilder::new("agree-sync")
        .add_stage(UppercaseStage)
        .add_stage(AppendStage::new("123"))
        .build();

    let async_pipeline = AsyncPipelineBuilder::new("agree-async", Handle::current())
        .add_stage(Blocking(UppercaseStage))
        .add_stage(Blocking(AppendStage::new("123")))
        .build();

    for input in ["test", "", "MiXeD case"] {
        let sync_out = sync_pipeline.execute(input.to_string()).unwrap();
        let async_out = async_pipeline.execute_async(input.to_string()).await.unwrap();
        assert_eq!(sync_out, async_out);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn async_short_circuit_skips_remaining_stages() {
    let counter = Arc::new(AtomicUsize::new(0));
    let pipeline = AsyncPipelineBuilder::new("async-short-circuit", Handle::current())
        .add_stage(SleepStage::new("Warmup", 1))
        .add_stage(Blocking(FailStage::new("Middle", "halt")))
        .add_stage(Blocking(CountingStage::new("Tail", Arc::clone(&counter))))
        .build();

    let err = pipeline.execute_async("input".into()).await.unwrap_err();
    assert_eq!(err.to_string(), "failed in stage 'Middle': halt");
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn async_execute_is_idempotent() {
    let pipeline = AsyncPipelineBuilder::new("async-idempotent", Handle::current())
        .add_stage(Blocking(UppercaseStage))
        .build();

    let first = pipeline.execute_async("stable".into()).await.unwrap();
    let second = pipeline.execute_async("stable".into()).await.unwrap();
    assert_eq!(first, second);
}

#[test]
fn blocking_and_deferred_async_agree() {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let pipeline = AsyncPipelineBuilder::new("both-ways", rt.handle().clone())
        .add_stage(Blocking(UppercaseStage))
        .add_stage(Blocking(AppendStage::new("123")))
        .build();

    let blocking = pipeline.execute("test".into()).unwrap();
    let deferred = rt.block_on(pipeline.execute_async("test".into())).unwrap();
    assert_eq!(blocking, deferred);

    let failing = AsyncPipelineBuilder::new("both-ways-failing", rt.handle().clone())
        .add_stage(Blocking(FailStage::new("ErrorStage", "Intentional error")))
        .build();

    let blocking_err = failing.execute("test".into()).unwrap_err();
    let deferred_err = rt
        .block_on(failing.execute_async("test".into()))
        .unwrap_err();
    assert_eq!(blocking_err.to_string(), deferred_err.to_string());
    assert_eq!(blocking_err.stage_name(), deferred_err.stage_name());
}

#[test]
fn distributed_matches_sync_error_contract() {
    let pipeline = DistributedPipeline::new("distributed-contract").register_stage(
        "ErrorStage",
        Arc::new(StageEndpoint::new(
            "svc://error",
            FnStage::new(
                "ErrorStage",
                |_: serde_json::Value, _: &RunContext| -> anyhow::Result<serde_json::Value> {
                    Err(anyhow::anyhow!("Intentional error"))
                },
            ),
        )),
    );

    let err = pipeline.execute(serde_json::json!("x")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed in stage 'ErrorStage': Intentional error"
    );
}

#[test]
fn distributed_unbound_name_invokes_nothing() {
    let before = CountingEndpoint::new("svc://ingest", Arc::new(AtomicUsize::new(0)));
    let after = CountingEndpoint::new("svc://store", Arc::new(AtomicUsize::new(0)));

    let pipeline = DistributedPipeline::new("gapped")
        .register_stage("ingest", Arc::new(before.clone()))
        .declare_stage("transform")
        .register_stage("store", Arc::new(after.clone()));

    let err = pipeline.execute(serde_json::json!("doc")).unwrap_err();
    assert_eq!(err.to_string(), "no endpoint for stage 'transform'");

    // The stage before the gap ran; the one after never did.
    assert_eq!(before.count(), 1);
    assert_eq!(after.count(), 0);
}

#[test]
fn context_attributes_flow_between_stages() {
    let pipeline = PipelineBuilder::new("attribute-flow")
        .add_stage(FnStage::new("Stash", |s: String, ctx: &RunContext| {
            ctx.set_attribute("seen.length", s.len());
            Ok(s)
        }))
        .add_stage(FnStage::new("Recall", |s: String, ctx: &RunContext| {
            let len = ctx.attribute_as::<usize>("seen.length").unwrap_or(0);
            Ok(format!("{s}:{len}"))
        }))
        .build();

    assert_eq!(pipeline.execute("abcd".into()).unwrap(), "abcd:4");
}

#[test]
fn retrying_caller_owns_the_attempt_counter() {
    let pipeline = PipelineBuilder::new("caller-retries")
        .add_stage(FnStage::new("Flaky", |_: (), ctx: &RunContext| {
            if ctx.attempt() < 3 {
                Err(anyhow::anyhow!("not yet"))
            } else {
                Ok(ctx.attempt())
            }
        }))
        .build();

    let ctx = RunContext::new();
    let mut result = pipeline.execute_with((), &ctx);
    while result.is_err() && ctx.attempt() < 5 {
        ctx.increment_attempt();
        result = pipeline.execute_with((), &ctx);
    }

    assert_eq!(result.unwrap(), 3);
}
