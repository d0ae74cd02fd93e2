use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;
use velo::router::{HandlerFuture, Phase, Router};
use velo::{
    ListenerConf, Method, Request, Response, Server, ServerConf, StatusCode,
};

type Db = Arc<Mutex<Vec<String>>>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let db: Db = Arc::default();

    let mut router = Router::new();
    router.add_constraint("id", r"\d+")?;

    router.route(Method::GET, "/", index)?;
    router.route(Method::GET, "/tasks/{id}", task)?;
    router.route([Method::GET], "/static/*", not_yet)?;

    router.route(Method::POST, "/tasks", AddTask(Arc::clone(&db)))?;

    router.add(Phase::Response, |_req: &mut Request, res: &mut Response| {
        res.headers_mut().append(
            "server".parse().expect("valid name"),
            "velo-demo".into(),
        );
        true
    });

    let mut listener = ListenerConf::new("0.0.0.0", 3000);
    listener.timeout_ms = Some(30_000);

    let server = Server::new(
        router,
        ServerConf {
            listeners: vec![listener],
            threads: 2,
        },
    );

    tracing::info!("demo listening on 0.0.0.0:3000");
    server.run_blocking()?;
    Ok(())
}

// ===== Routes =====

/// Stateful handler: the task list lives for the router's lifetime.
struct AddTask(Db);

impl velo::router::Handler for AddTask {
    fn call<'a>(&self, req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
        let list = Arc::clone(&self.0);
        let name = String::from_utf8_lossy(req.body()).into_owned();
        Box::pin(async move {
            let mut tasks = match list.lock() {
                Ok(tasks) => tasks,
                Err(poisoned) => poisoned.into_inner(),
            };
            tasks.push(name);
            res.set_status(StatusCode::CREATED);
            res.set_body(bytes::Bytes::from(format!("{} tasks\n", tasks.len())));
        })
    }
}

fn index<'a>(_req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        res.set_status(StatusCode::OK);
        res.set_body(&b"velo demo: GET /tasks/{id}, POST /tasks\n"[..]);
    })
}

fn task<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        let id = req.params().get("id").unwrap_or("0").to_owned();
        res.set_status(StatusCode::OK);
        res.set_body(bytes::Bytes::from(format!("task #{id}\n")));
    })
}

fn not_yet<'a>(_req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        res.set_status(StatusCode::NOT_FOUND);
        res.set_body(&b"no static files yet\n"[..]);
    })
}
