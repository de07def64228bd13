//! Login, guarded access and logout through the engine dispatcher.

use std::time::Duration;

use bytes::Bytes;
use http::header::{COOKIE, SET_COOKIE};
use http::{Request, Response, StatusCode};
use trellis_core::{handler, Context};
use trellis_server::Engine;
use trellis_session::{need_session, Manager};

fn app(sessions: &Manager) -> Engine {
    let mut engine = Engine::new();

    let login = sessions.clone();
    engine.get(
        "/login/:name",
        [handler(move |ctx: &mut Context| {
            let name = ctx.param("name").unwrap_or_default().to_string();
            let session = login.init_session(ctx)?;
            session.set("name", &name)?;
            login.save_session(ctx, &session)?;
            ctx.string(StatusCode::OK, "login success")
        })],
    );

    let logout = sessions.clone();
    engine.get(
        "/logout",
        [handler(move |ctx: &mut Context| {
            if logout.get_session(ctx).is_err() {
                ctx.status(StatusCode::UNAUTHORIZED);
                return Ok(());
            }
            logout.remove_session(ctx)?;
            ctx.string(StatusCode::OK, "logout success")
        })],
    );

    let mut user = engine.group("/user");
    user.use_middleware([need_session(sessions.clone(), None)]);
    let greet = sessions.clone();
    user.get(
        "/hello",
        [handler(move |ctx: &mut Context| {
            let session = greet.get_session(ctx)?;
            let name: String = session.get("name")?;
            let visits = session.get::<u32>("visits").unwrap_or(0) + 1;
            session.set("visits", &visits)?;
            ctx.string(StatusCode::OK, format!("hello {name} #{visits}"))
        })],
    );

    engine
}

fn get(engine: &Engine, path: &str, cookie: Option<&str>) -> Response<Bytes> {
    let mut request = Request::get(path);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    engine.dispatch(request.body(Bytes::new()).unwrap()).unwrap()
}

fn body(response: &Response<Bytes>) -> &str {
    std::str::from_utf8(response.body()).unwrap()
}

/// Turns `session_id=<id>; Path=/` into `session_id=<id>`.
fn cookie_from(response: &Response<Bytes>) -> String {
    let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[test]
fn guarded_route_requires_login() {
    let sessions = Manager::in_memory(Duration::from_secs(60));
    let engine = app(&sessions);

    let response = get(&engine, "/user/hello", None);
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get(&engine, "/user/hello", Some("session_id=forged"));
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn login_then_hello_then_logout() {
    let sessions = Manager::in_memory(Duration::from_secs(60));
    let engine = app(&sessions);

    let response = get(&engine, "/login/ana", None);
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = cookie_from(&response);
    assert!(cookie.starts_with("session_id="));

    let response = get(&engine, "/user/hello", Some(&cookie));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response), "hello ana #1");

    // the guard saved the modified counter after the first visit
    let response = get(&engine, "/user/hello", Some(&cookie));
    assert_eq!(body(&response), "hello ana #2");

    let response = get(&engine, "/logout", Some(&cookie));
    assert_eq!(body(&response), "logout success");
    assert!(response.headers()[SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let response = get(&engine, "/user/hello", Some(&cookie));
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn second_login_replaces_first_session() {
    let sessions = Manager::in_memory(Duration::from_secs(60));
    let engine = app(&sessions);

    let first = cookie_from(&get(&engine, "/login/ana", None));
    let second = cookie_from(&get(&engine, "/login/bob", Some(&first)));
    assert_ne!(first, second);

    assert_eq!(
        get(&engine, "/user/hello", Some(&first)).status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        body(&get(&engine, "/user/hello", Some(&second))),
        "hello bob #1"
    );
}
