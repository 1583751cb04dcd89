//! Behaviour of the rewrite stage as seen by a downstream handler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};

use rewrite_proxy::lifecycle::Lifecycle;
use rewrite_proxy::rewrite::{
    Applied, Attributes, Callback, GatedRuleContainer, Handled, Handler, RewriteError, RewriteStage, Rule,
    RuleContainer, RuleHandler,
};
use rewrite_proxy::rules::{
    FnRule, RedirectPatternRule, RewritePatternRule, ResponsePatternRule, TerminatingPatternRule,
};

/// What the downstream handler saw.
#[derive(Default)]
struct Seen {
    uris: Mutex<Vec<String>>,
    attributes: Mutex<Vec<Option<Attributes>>>,
    calls: AtomicUsize,
}

fn recording(seen: Arc<Seen>) -> Arc<dyn Handler> {
    Arc::new(move |request: Request<Body>, callback: Callback| {
        seen.calls.fetch_add(1, Ordering::SeqCst);
        seen.uris.lock().unwrap().push(request.uri().to_string());
        seen.attributes
            .lock()
            .unwrap()
            .push(request.extensions().get::<Attributes>().cloned());
        callback.succeeded(Response::new(Body::empty()));
        Handled::Accepted
    })
}

fn get(uri: &str, host: &str) -> Request<Body> {
    Request::builder().uri(uri).header("host", host).body(Body::empty()).unwrap()
}

async fn dispatch(stage: &RewriteStage, request: Request<Body>) -> Result<Response<Body>, RewriteError> {
    let (callback, completion) = Callback::new();
    assert!(stage.handle(request, callback).is_accepted());
    completion.await
}

fn tag(name: &'static str) -> Arc<dyn Rule> {
    Arc::new(FnRule::new(
        |_: &RuleHandler| true,
        move |node: RuleHandler| {
            let path = format!("{}/{}", node.path().trim_end_matches('/'), name);
            node.with_path(&path)
        },
    ))
}

#[tokio::test]
async fn test_old_new_scenario() {
    let seen = Arc::new(Seen::default());
    let stage = RewriteStage::new(recording(seen.clone()));
    stage.add_rule(Arc::new(RewritePatternRule::new("/old/*", "/new/*").unwrap()));
    stage.start();

    dispatch(&stage, get("/old/42", "example.com")).await.unwrap();
    dispatch(&stage, get("/other", "example.com")).await.unwrap();

    assert_eq!(*seen.uris.lock().unwrap(), vec!["/new/42".to_string(), "/other".to_string()]);
    assert_eq!(seen.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rules_apply_in_insertion_order() {
    let seen = Arc::new(Seen::default());
    let stage = RewriteStage::new(recording(seen.clone()));
    stage.set_rules(vec![tag("a"), tag("b"), tag("c")]);
    stage.start();

    dispatch(&stage, get("/", "example.com")).await.unwrap();
    assert_eq!(seen.uris.lock().unwrap()[0], "/a/b/c");
}

#[tokio::test]
async fn test_no_match_dispatches_original_request() {
    let seen = Arc::new(Seen::default());
    let stage = RewriteStage::new(recording(seen.clone()));
    stage.add_rule(Arc::new(RewritePatternRule::new("/never/*", "/x/*").unwrap()));
    stage.set_original_path_attribute(Some("original".into()));
    stage.start();

    dispatch(&stage, get("/plain?q=1", "example.com")).await.unwrap();
    assert_eq!(seen.uris.lock().unwrap()[0], "/plain?q=1");
    assert_eq!(seen.attributes.lock().unwrap()[0], None);
}

#[tokio::test]
async fn test_terminating_rule_stops_later_rules() {
    let seen = Arc::new(Seen::default());
    let stage = RewriteStage::new(recording(seen.clone()));
    stage.set_rules(vec![
        tag("a"),
        Arc::new(RewritePatternRule::new("/a", "/stop").unwrap().terminating(true)),
        tag("never"),
    ]);
    stage.start();

    dispatch(&stage, get("/", "example.com")).await.unwrap();
    assert_eq!(seen.uris.lock().unwrap()[0], "/stop");
}

#[tokio::test]
async fn test_termination_stays_inside_nested_container() {
    let seen = Arc::new(Seen::default());
    let stage = RewriteStage::new(recording(seen.clone()));

    let inner = RuleContainer::with_rules(vec![
        tag("i1"),
        Arc::new(TerminatingPatternRule::new("/*").unwrap()),
        tag("i2"),
    ]);
    assert!(!inner.is_terminating());
    stage.set_rules(vec![Arc::new(inner), tag("outer")]);
    stage.start();

    dispatch(&stage, get("/", "example.com")).await.unwrap();
    assert_eq!(*seen.uris.lock().unwrap(), vec!["/i1/outer".to_string()]);
}

#[tokio::test]
async fn test_original_path_attribute_reaches_downstream() {
    let seen = Arc::new(Seen::default());
    let stage = RewriteStage::new(recording(seen.clone()));
    stage.set_rules(vec![
        Arc::new(RewritePatternRule::new("/old/*", "/new/*").unwrap()),
        Arc::new(RewritePatternRule::new("/new/*", "/newer/*").unwrap()),
    ]);
    stage.set_original_path_attribute(Some("rewrite.original".into()));
    stage.start();

    dispatch(&stage, get("/old/1", "example.com")).await.unwrap();

    assert_eq!(seen.uris.lock().unwrap()[0], "/newer/1");
    let attributes = seen.attributes.lock().unwrap()[0].clone().unwrap();
    assert_eq!(attributes.get("rewrite.original"), Some("/old/1"));
}

#[tokio::test]
async fn test_virtual_host_maintenance_scenario() {
    let seen = Arc::new(Seen::default());
    let stage = RewriteStage::new(recording(seen.clone()));

    let maintenance = GatedRuleContainer::virtual_hosts(["shop.example.com"]).unwrap().terminating(true);
    maintenance.add_rule(Arc::new(RewritePatternRule::new("/*", "/maintenance.html").unwrap()));
    stage.set_rules(vec![Arc::new(maintenance), tag("app")]);
    stage.start();

    dispatch(&stage, get("/cart", "SHOP.example.com:8443")).await.unwrap();
    dispatch(&stage, get("/cart", "blog.example.com")).await.unwrap();

    assert_eq!(
        *seen.uris.lock().unwrap(),
        vec!["/maintenance.html".to_string(), "/cart/app".to_string()]
    );
}

#[tokio::test]
async fn test_short_circuit_never_reaches_downstream() {
    let seen = Arc::new(Seen::default());
    let stage = RewriteStage::new(recording(seen.clone()));
    stage.set_rules(vec![
        Arc::new(RedirectPatternRule::new("/moved", "/elsewhere").unwrap()),
        Arc::new(ResponsePatternRule::new("/gone", 410, None).unwrap()),
    ]);
    stage.start();

    let response = dispatch(&stage, get("/moved", "example.com")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let response = dispatch(&stage, get("/gone", "example.com")).await.unwrap();
    assert_eq!(response.status(), StatusCode::GONE);

    assert_eq!(seen.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_callback_completes_exactly_once() {
    let completions = Arc::new(AtomicUsize::new(0));
    let counter = completions.clone();
    let stage = RewriteStage::new(Arc::new(move |_request: Request<Body>, callback: Callback| {
        counter.fetch_add(1, Ordering::SeqCst);
        callback.succeeded(Response::new(Body::empty()));
        Handled::Accepted
    }));
    stage.add_rule(tag("x"));
    stage.start();

    let response = dispatch(&stage, get("/", "example.com")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_handler_dropping_callback_reports_abandoned() {
    let stage = RewriteStage::new(Arc::new(|_request: Request<Body>, callback: Callback| {
        drop(callback);
        Handled::Accepted
    }));
    stage.start();

    let err = dispatch(&stage, get("/", "example.com")).await.unwrap_err();
    assert!(matches!(err, RewriteError::Abandoned));
}

#[tokio::test]
async fn test_declining_downstream_is_reported() {
    let stage = RewriteStage::new(Arc::new(|request: Request<Body>, callback: Callback| Handled::Declined {
        request,
        callback,
    }));
    stage.add_rule(tag("x"));
    stage.start();

    let (callback, _completion) = Callback::new();
    match stage.handle(get("/", "example.com"), callback) {
        Handled::Declined { request, callback } => {
            assert_eq!(request.uri().path(), "/x");
            callback.succeeded(Response::new(Body::empty()));
        }
        Handled::Accepted => panic!("downstream declined, stage must too"),
    }
}

#[test]
fn test_stopped_stage_declines() {
    let seen = Arc::new(Seen::default());
    let stage = RewriteStage::new(recording(seen.clone()));
    stage.start();
    stage.stop();

    let (callback, _completion) = Callback::new();
    assert!(!stage.handle(get("/", "example.com"), callback).is_accepted());
    assert_eq!(seen.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failing_gate_leaves_request_untouched() {
    let container = GatedRuleContainer::new(|request: &RuleHandler| request.method() == &Method::POST);
    container.add_rule(tag("x"));

    let (parts, _) = get("/keep", "example.com").into_parts();
    match container.match_and_apply(RuleHandler::new(parts)).unwrap() {
        Applied::Unmatched(handler) => assert_eq!(handler.path(), "/keep"),
        Applied::Matched(_) => panic!("gate should have been closed for GET"),
    }
}
