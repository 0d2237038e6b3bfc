//! Chain compilation: short-circuit, identity, determinism and errors.

mod common;

use edge_dispatch::error::ConfigurationError;
use edge_dispatch::pipeline::{build, ChainBuilder, HandlerRef};
use edge_dispatch::rewrite::{EdgeRequest, EventType, Message, WebpageRewriteStrategy};

#[test]
fn test_empty_chain_is_no_pipeline() {
    assert!(build("none", EventType::ViewerRequest, &[]).unwrap().is_none());
    assert!(ChainBuilder::viewer_response("none").compile().unwrap().is_none());
}

#[test]
fn test_stop_output_wins_regardless_of_later_handlers() {
    let alone = common::run_request_chain(&[HandlerRef::redirect("/target")], "/src");
    let followed = common::run_request_chain(
        &[
            HandlerRef::redirect("/target"),
            HandlerRef::path_element(0, "changed"),
            HandlerRef::webpage(WebpageRewriteStrategy::SubDir),
        ],
        "/src",
    );
    assert_eq!(alone, followed);
}

#[test]
fn test_non_matching_handlers_are_identity() {
    let request = EdgeRequest::new("/nothing")
        .with_header("accept", "text/html");
    let compiled = common::compile_request_chain(&[
        HandlerRef::path_element(3, "x"),
        HandlerRef::path_regex(r"^/user/(\d+)", &["0"]),
    ]);
    assert_eq!(
        compiled.pipeline.run(request.clone().into()),
        Message::Request(request)
    );
}

#[test]
fn test_identical_input_gives_identical_artifacts() {
    let handlers = [
        HandlerRef::basic_auth("dXNlcjpwYXNz"),
        HandlerRef::path_regex(r"^/user/(\d*)/(\w*)", &["0", "-"]),
        HandlerRef::webpage(WebpageRewriteStrategy::File),
    ];
    let first = common::compile_request_chain(&handlers).artifact;
    let second = common::compile_request_chain(&handlers).artifact;
    assert_eq!(first, second);

    let different = common::compile_request_chain(&handlers[..2]).artifact;
    assert_ne!(first.digest, different.digest);
}

#[test]
fn test_same_handler_in_different_chains() {
    let a = build("a", EventType::ViewerRequest, &[HandlerRef::redirect("/a")])
        .unwrap()
        .unwrap();
    let b = build("b", EventType::ViewerRequest, &[HandlerRef::redirect("/b")])
        .unwrap()
        .unwrap();
    assert!(a.artifact.code.contains(r#"location: { value: "/a" }"#));
    assert!(b.artifact.code.contains(r#"location: { value: "/b" }"#));
}

#[test]
fn test_parameter_values_are_literal_safe() {
    let artifact = common::compile_request_chain(&[HandlerRef::path_to(
        "/quote\"d/__PARAM_PATH__/\u{2028}",
    )])
    .artifact;
    assert!(artifact
        .code
        .contains(r#"request.uri = "/quote\"d/__PARAM_PATH__/\u2028";"#));
}

#[test]
fn test_compile_errors() {
    let unknown = build("c", EventType::ViewerRequest, &[HandlerRef::new("gzip")]).unwrap_err();
    assert_eq!(
        unknown,
        ConfigurationError::UnknownHandler {
            name: "gzip".into()
        }
    );

    let mismatch = build(
        "c",
        EventType::ViewerRequest,
        &[HandlerRef::path_regex(r"^/(a)/(b)/(c)", &["x", "y"])],
    )
    .unwrap_err();
    assert_eq!(
        mismatch,
        ConfigurationError::ReplacementCountMismatch {
            pattern: r"^/(a)/(b)/(c)".into(),
            groups: 3,
            replacements: 2
        }
    );

    let invalid = build(
        "c",
        EventType::ViewerRequest,
        &[HandlerRef::path_regex(r"^/(unclosed", &["x"])],
    )
    .unwrap_err();
    assert!(matches!(invalid, ConfigurationError::InvalidParameter { .. }));

    let phase = build("c", EventType::ViewerResponse, &[HandlerRef::path_to("/x")]).unwrap_err();
    assert!(matches!(phase, ConfigurationError::PhaseMismatch { .. }));
}

#[test]
fn test_builder_is_append_only() {
    let mut chain = ChainBuilder::viewer_request("site-std-viewer-request");
    chain.with_basic_auth("user", "pass").unwrap();
    let compiled = chain.compile_required().unwrap();
    assert_eq!(compiled.pipeline.handler_names(), vec!["basic-auth"]);

    assert_eq!(
        chain.redirect_permanently("/x").unwrap_err(),
        ConfigurationError::ChainFrozen {
            chain: "site-std-viewer-request".into()
        }
    );
    assert!(chain.compile_required().is_err());
}
