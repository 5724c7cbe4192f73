// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use indoc::indoc;
use pretty_assertions::assert_eq;

use dockerfile_graph::{compile, BuildOptions, CancellationToken, MemoryContext, NodeKind, Platform, Source};

mod common;
use common::{FakeAptEngine, NullEngine};

fn platform(s: &str) -> Platform {
  Platform::parse(s)
}

#[tokio::test]
async fn determinism_same_inputs_yield_identical_graphs() {
  common::init_tracing();

  let source = "FROM scratch\nCOPY a.txt /\n";
  let context = MemoryContext::new().with_file("a.txt", "hi");
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let first = compile(source, &options, &context, &engine, &cancel).await.unwrap();
  let second = compile(source, &options, &context, &engine, &cancel).await.unwrap();

  let first_ids: Vec<_> = first.graph.nodes.iter().map(|n| n.id).collect();
  let second_ids: Vec<_> = second.graph.nodes.iter().map(|n| n.id).collect();
  assert_eq!(first_ids, second_ids);
  assert_eq!(first.graph.serialize(), second.graph.serialize());
}

#[tokio::test]
async fn unchanged_dockerfile_reuses_every_node_address() {
  let source = "FROM alpine\nENV X=1\nRUN echo hi\n";
  let context = MemoryContext::new();
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let a = compile(source, &options, &context, &engine, &cancel).await.unwrap();
  let b = compile(source, &options, &context, &engine, &cancel).await.unwrap();

  assert_eq!(a.graph.nodes.len(), b.graph.nodes.len());
  for (x, y) in a.graph.nodes.iter().zip(b.graph.nodes.iter()) {
    assert_eq!(x.id, y.id);
  }
}

#[tokio::test]
async fn reordering_two_runs_changes_the_final_node_address() {
  let context = MemoryContext::new();
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let a = compile(
    "FROM alpine\nRUN echo one\nRUN echo two\n",
    &options, &context, &engine, &cancel
  ).await.unwrap();
  let b = compile(
    "FROM alpine\nRUN echo two\nRUN echo one\n",
    &options, &context, &engine, &cancel
  ).await.unwrap();

  // Each RUN's exec node depends on the previous node's address, so the
  // final node differs whenever dispatch order differs, even though the
  // two command sets are identical.
  let a_last = a.graph.nodes.last().unwrap();
  let b_last = b.graph.nodes.last().unwrap();
  assert_ne!(a_last.id, b_last.id);
}

#[tokio::test]
async fn env_declaration_order_does_not_affect_the_final_env_map() {
  // ENV/LABEL are config-only mutations; a BTreeMap-backed scope means
  // declaration order never leaks into a later RUN's exec node, so
  // genuinely commutative config changes stay cache-stable.
  let context = MemoryContext::new();
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let a = compile(
    "FROM alpine\nENV A=1\nENV B=2\nRUN echo hi\n",
    &options, &context, &engine, &cancel
  ).await.unwrap();
  let b = compile(
    "FROM alpine\nENV B=2\nENV A=1\nRUN echo hi\n",
    &options, &context, &engine, &cancel
  ).await.unwrap();

  assert_eq!(a.graph.nodes.last().unwrap().id, b.graph.nodes.last().unwrap().id);
}

#[tokio::test]
async fn single_stage_scratch_copy_end_to_end() {
  let context = MemoryContext::new().with_file("a.txt", "hi");
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let output = compile("FROM scratch\nCOPY a.txt /\n", &options, &context, &engine, &cancel).await.unwrap();

  assert_eq!(output.config.history.len(), 1);
  assert_eq!(output.config.history[0].created_by, "COPY a.txt /");

  let last = output.graph.nodes.last().unwrap();
  match &last.kind {
    NodeKind::File { entries, .. } => {
      assert_eq!(entries.len(), 1);
      assert_eq!(entries[0].dest_path, "/a.txt");
    },
    other => panic!("expected a File node, got {:?}", other)
  }
}

#[tokio::test]
async fn multi_stage_copy_from_reads_prior_stage_not_context() {
  let context = MemoryContext::new();
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let output = compile(
    "FROM scratch AS a\nFROM a\nCOPY --from=a / /\n",
    &options, &context, &engine, &cancel
  ).await.unwrap();

  let last = output.graph.nodes.last().unwrap();
  match &last.kind {
    NodeKind::File { inputs, .. } => assert_eq!(inputs.len(), 2),
    other => panic!("expected a File node, got {:?}", other)
  }
}

#[tokio::test]
async fn copy_from_an_unknown_name_reads_an_image_not_a_stage() {
  let context = MemoryContext::new();
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let output = compile(
    "FROM scratch\nCOPY --from=nginx:latest /etc/nginx /nginx\n",
    &options, &context, &engine, &cancel
  ).await.unwrap();

  let source_node = &output.graph.nodes[output.graph.nodes.len() - 2];
  match &source_node.kind {
    NodeKind::Source(Source::Image { reference, .. }) => assert_eq!(reference, "nginx:latest"),
    other => panic!("expected an image source, got {:?}", other)
  }
}

#[tokio::test]
async fn build_arg_override_changes_resolved_base_image() {
  let context = MemoryContext::new();
  let mut options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  options.build_args.insert("V".to_string(), "latest".to_string());
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let output = compile("ARG V=1.2\nFROM busybox:${V}\n", &options, &context, &engine, &cancel).await.unwrap();

  match &output.graph.nodes[0].kind {
    NodeKind::Source(Source::Image { reference, .. }) => assert_eq!(reference, "busybox:latest"),
    other => panic!("expected an image source, got {:?}", other)
  }
}

#[tokio::test]
async fn add_apt_produces_the_five_node_three_phase_pipeline() {
  let context = MemoryContext::new();
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = FakeAptEngine {
    listing: "'http://archive.ubuntu.com/pool/nginx_1.18.0.deb' nginx_1.18.0_amd64.deb 123456 SHA256:aa\n".to_string()
  };
  let cancel = CancellationToken::new();

  let output = compile("FROM ubuntu\nADD --apt nginx\n", &options, &context, &engine, &cancel).await.unwrap();

  let created_by: Vec<&str> = output.config.history.iter().map(|h| h.created_by.as_str()).collect();
  assert_eq!(created_by, vec![
    "ADD (apt update) nginx",
    "ADD (apt download) nginx",
    "ADD (apt install) nginx"
  ]);

  let install = output.graph.nodes.last().unwrap();
  match &install.kind {
    NodeKind::Exec { inputs, spec } => {
      assert_eq!(inputs.len(), 1);
      assert!(spec.mounts.iter().any(|m| matches!(m, dockerfile_graph::Mount::Bind { .. })));
    },
    other => panic!("expected install exec node, got {:?}", other)
  }
}

#[tokio::test]
async fn copy_link_is_emitted_as_a_merge_over_the_base() {
  let context = MemoryContext::new().with_file("a.txt", "hi");
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let output = compile("FROM scratch\nCOPY --link a.txt /\n", &options, &context, &engine, &cancel).await.unwrap();

  let last = output.graph.nodes.last().unwrap();
  match &last.kind {
    NodeKind::Merge { inputs } => assert_eq!(inputs.len(), 2),
    other => panic!("expected a Merge node for --link, got {:?}", other)
  }
}

#[tokio::test]
async fn copy_without_link_is_a_plain_delta_not_a_merge() {
  let context = MemoryContext::new().with_file("a.txt", "hi");
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let output = compile("FROM scratch\nCOPY a.txt /\n", &options, &context, &engine, &cancel).await.unwrap();

  let last = output.graph.nodes.last().unwrap();
  assert!(matches!(last.kind, NodeKind::File { .. }));
}

#[tokio::test]
async fn run_heredoc_body_becomes_the_shell_script() {
  let context = MemoryContext::new();
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let output = compile(
    "FROM scratch\nRUN <<EOF\necho hi\necho bye\nEOF\n",
    &options, &context, &engine, &cancel
  ).await.unwrap();

  let last = output.graph.nodes.last().unwrap();
  match &last.kind {
    NodeKind::Exec { spec, .. } => {
      assert_eq!(spec.args.last().unwrap(), "echo hi\necho bye\n");
    },
    other => panic!("expected exec node, got {:?}", other)
  }
}

#[tokio::test]
async fn global_arg_is_invisible_in_stage_body_without_redeclaration() {
  let context = MemoryContext::new();
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  // `V` parameterizes the base image directly (resolver sees the full
  // global ARG env), but is not redeclared in the stage body, so `ENV`
  // here must not see it either.
  let output = compile(
    "ARG V=1.2\nFROM busybox:${V}\nENV X=$V\n",
    &options, &context, &engine, &cancel
  ).await.unwrap();

  assert_eq!(output.config.env.get("X").map(String::as_str), Some(""));
}

#[tokio::test]
async fn global_arg_becomes_visible_after_bare_redeclaration() {
  let context = MemoryContext::new();
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();

  let output = compile(
    indoc!("
      ARG V=1.2
      FROM busybox:${V}
      ARG V
      ENV X=$V
    "),
    &options, &context, &engine, &cancel
  ).await.unwrap();

  assert_eq!(output.config.env.get("X").map(String::as_str), Some("1.2"));
}

#[tokio::test]
async fn cancellation_before_dispatch_aborts_with_no_partial_success() {
  let context = MemoryContext::new();
  let options = BuildOptions::new(platform("linux/amd64"), platform("linux/amd64"));
  let engine = NullEngine;
  let cancel = CancellationToken::new();
  cancel.cancel();

  let result = compile("FROM scratch\nCOPY a.txt /\n", &options, &context, &engine, &cancel).await;
  assert!(matches!(result, Err(dockerfile_graph::Error::Cancelled)));
}
