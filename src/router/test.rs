use super::*;
use crate::http::{Method, StatusCode};
use crate::request::Request;
use crate::response::Response;
use crate::uri::Uri;

fn handler<'a>(_req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        res.set_status(StatusCode::OK);
    })
}

fn request(method: Method, target: &str) -> Request {
    let mut req = Request::new();
    let uri = Uri::parse_origin(target.as_bytes()).unwrap();
    req.set_metadata(method, uri, crate::http::Version::HTTP_11);
    req
}

fn found(router: &Router, method: Method, target: &str) -> (RouteId, Request) {
    let mut req = request(method, target);
    match router.match_request(&mut req) {
        MatchOutcome::Found(id) => (id, req),
        other => panic!("expected Found for {target}, got {other:?}"),
    }
}

#[test]
fn test_literal_bijectivity() {
    let mut router = Router::new();
    let patterns = ["/", "/a", "/a/b", "/a/c", "/b", "/a/b/"];
    for pattern in patterns {
        router.route(Method::GET, pattern, handler).unwrap();
    }

    for pattern in patterns {
        let (id, _) = found(&router, Method::GET, pattern);
        assert_eq!(router.at(id).pattern(), pattern, "{pattern}");
    }

    let mut req = request(Method::GET, "/a/missing");
    assert_eq!(router.match_request(&mut req), MatchOutcome::NotFound);
}

#[test]
fn test_trailing_slash_discipline() {
    let mut router = Router::new();
    router.route(Method::GET, "/users", handler).unwrap();

    let mut req = request(Method::GET, "/users/");
    assert_eq!(router.match_request(&mut req), MatchOutcome::NotFound);

    router.route(Method::GET, "/users/", handler).unwrap();
    let (id, _) = found(&router, Method::GET, "/users/");
    assert_eq!(router.at(id).pattern(), "/users/");
    let (id, _) = found(&router, Method::GET, "/users");
    assert_eq!(router.at(id).pattern(), "/users");
}

#[test]
fn test_method_check_after_path() {
    let mut router = Router::new();
    router.route(Method::GET, "/only-get", handler).unwrap();

    let mut req = request(Method::POST, "/only-get");
    assert_eq!(
        router.match_request(&mut req),
        MatchOutcome::MethodNotAllowed
    );

    let mut req = request(Method::POST, "/missing");
    assert_eq!(router.match_request(&mut req), MatchOutcome::NotFound);

    // wildcard method set admits anything
    let mut router = Router::new();
    router
        .route(crate::http::MethodSet::Any, "/anything", handler)
        .unwrap();
    found(&router, Method::PATCH, "/anything");
}

#[test]
fn test_param_binding() {
    let mut router = Router::new();
    router
        .route(Method::GET, "/users/{id}/posts/{slug}", handler)
        .unwrap();

    let (_, req) = found(&router, Method::GET, "/users/42/posts/hello-world");
    assert_eq!(req.params().get("id"), Some("42"));
    assert_eq!(req.params().get("slug"), Some("hello-world"));
    assert_eq!(req.params().len(), 2);
}

#[test]
fn test_param_constraint() {
    let mut router = Router::new();
    router
        .route(Method::GET, r"/users/{id:\d+}", handler)
        .unwrap();

    let (_, req) = found(&router, Method::GET, "/users/42");
    assert_eq!(req.params().get("id"), Some("42"));

    let mut req = request(Method::GET, "/users/abc");
    assert_eq!(router.match_request(&mut req), MatchOutcome::NotFound);

    // the constraint is anchored, a substring match is not enough
    let mut req = request(Method::GET, "/users/42abc");
    assert_eq!(router.match_request(&mut req), MatchOutcome::NotFound);
}

#[test]
fn test_named_constraint_registry() {
    let mut router = Router::new();
    router.add_constraint("id", r"\d+").unwrap();
    router.route(Method::GET, "/orders/{id}", handler).unwrap();

    found(&router, Method::GET, "/orders/7");
    let mut req = request(Method::GET, "/orders/seven");
    assert_eq!(router.match_request(&mut req), MatchOutcome::NotFound);

    assert!(router.add_constraint("bad", "[").is_err());
}

#[test]
fn test_literal_wins_over_param() {
    let mut router = Router::new();
    let all = router.route(Method::GET, "/users/all", handler).unwrap();
    let all_pattern = all.pattern().to_owned();
    router.route(Method::GET, "/users/{id}", handler).unwrap();

    let (id, req) = found(&router, Method::GET, "/users/all");
    assert_eq!(router.at(id).pattern(), all_pattern);
    assert!(req.params().is_empty());

    let (_, req) = found(&router, Method::GET, "/users/42");
    assert_eq!(req.params().get("id"), Some("42"));
}

#[test]
fn test_backtracking() {
    // the first param edge dead-ends, the search must back out and bind
    // the second
    let mut router = Router::new();
    router
        .route(Method::GET, r"/{a:\d+}/end", handler)
        .unwrap();
    router.route(Method::GET, "/{b}/other", handler).unwrap();

    let (id, req) = found(&router, Method::GET, "/42/other");
    assert_eq!(router.at(id).pattern(), "/{b}/other");
    // the rolled back binding for `a` must not leak
    assert_eq!(req.params().get("a"), None);
    assert_eq!(req.params().get("b"), Some("42"));
}

#[test]
fn test_param_edges_in_registration_order() {
    let mut router = Router::new();
    router
        .route(Method::GET, r"/{num:\d+}", handler)
        .unwrap();
    router.route(Method::GET, "/{any}", handler).unwrap();

    let (id, req) = found(&router, Method::GET, "/123");
    assert_eq!(router.at(id).pattern(), r"/{num:\d+}");
    assert_eq!(req.params().get("num"), Some("123"));

    let (id, _) = found(&router, Method::GET, "/abc");
    assert_eq!(router.at(id).pattern(), "/{any}");
}

#[test]
fn test_wildcard() {
    let mut router = Router::new();
    router.route(Method::GET, "/static/*", handler).unwrap();

    let (_, req) = found(&router, Method::GET, "/static/css/site.css");
    assert_eq!(req.params().get("*"), Some("css/site.css"));

    let (_, req) = found(&router, Method::GET, "/static/one");
    assert_eq!(req.params().get("*"), Some("one"));

    // zero remaining segments is not a wildcard match
    let mut req = request(Method::GET, "/static");
    assert_eq!(router.match_request(&mut req), MatchOutcome::NotFound);

    // escaped asterisk is a literal
    let mut router = Router::new();
    router.route(Method::GET, "/lit/\\*", handler).unwrap();
    found(&router, Method::GET, "/lit/*");
    let mut req = request(Method::GET, "/lit/other");
    assert_eq!(router.match_request(&mut req), MatchOutcome::NotFound);
}

#[test]
fn test_conflicts() {
    let mut router = Router::new();
    router.route(Method::GET, "/dup", handler).unwrap();
    assert!(matches!(
        router.route(Method::POST, "/dup", handler),
        Err(RouteError::Conflict(_))
    ));

    // same name, different constraints cannot share an edge
    router.route(Method::GET, r"/x/{id:\d+}", handler).unwrap();
    assert!(matches!(
        router.route(Method::GET, r"/x/{id:[a-z]+}", handler),
        Err(RouteError::ConstraintMismatch(_))
    ));

    // identical name and constraint merge
    router.route(Method::GET, r"/x/{id:\d+}/sub", handler).unwrap();
}

#[test]
fn test_middleware_order_global_then_route() {
    use std::sync::Mutex;
    use std::sync::Arc;

    let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();

    let mut router = Router::new();
    let trace = {
        let log = Arc::clone(&log);
        move |tag: &'static str| {
            let log = Arc::clone(&log);
            move |_req: &mut Request, _res: &mut Response| {
                log.lock().unwrap().push(tag);
                true
            }
        }
    };

    router.add(Phase::Header, trace("global"));
    router
        .route(Method::GET, "/traced", handler)
        .unwrap()
        .add(Phase::Header, trace("route-1"))
        .add(Phase::Header, trace("route-2"));

    let (id, mut req) = found(&router, Method::GET, "/traced");
    let mut res = Response::new();
    assert!(router.run_phase(Some(id), Phase::Header, &mut req, &mut res));
    assert_eq!(*log.lock().unwrap(), ["global", "route-1", "route-2"]);
}

#[test]
fn test_middleware_halt() {
    let mut router = Router::new();
    router.add(Phase::Header, |_req: &mut Request, res: &mut Response| {
        res.set_status(StatusCode::UNAUTHORIZED);
        false
    });
    router
        .route(Method::GET, "/guarded", handler)
        .unwrap()
        .add(Phase::Header, |_req: &mut Request, _res: &mut Response| {
            panic!("route chain must not run after a global halt")
        });

    let (id, mut req) = found(&router, Method::GET, "/guarded");
    let mut res = Response::new();
    assert!(!router.run_phase(Some(id), Phase::Header, &mut req, &mut res));
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_dump() {
    let mut router = Router::new();
    router.route(Method::GET, "/users/{id}", handler).unwrap();
    router.route(Method::GET, "/static/*", handler).unwrap();

    let dump = router.dump();
    assert!(dump.contains("users"));
    assert!(dump.contains("{id}"));
    assert!(dump.contains('*'));
}
