use http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tsu_restful::middleware::{Middleware, Next};
use tsu_restful::{Api, Error, JsonSettings, Method, Reply, Request, Resource, Response, Router};

fn every_verb() -> Resource {
    Resource::new("TestResource")
        .get(|_req: Request| async { json!({ "response": "get" }) })
        .post(|_req: Request| async { json!({ "response": "post" }) })
        .put(|_req: Request| async { json!({ "response": "put" }) })
        .delete(|_req: Request| async { json!({ "response": "delete" }) })
        .patch(|_req: Request| async { json!({ "response": "patch" }) })
}

fn passthrough() -> Resource {
    Resource::new("TestResponse")
        .get(|_req: Request| async { Response::json(br#"{"response":"get"}"#.to_vec()) })
}

fn app() -> Router {
    Api::new()
        .add_resource(every_verb(), &["/"])
        .add_resource(passthrough(), &["/response"])
        .register(Router::new())
}

#[tokio::test]
async fn declared_verbs_answer() {
    let router = app();
    for verb in ["get", "post", "put", "delete", "patch"] {
        let resp = router.call(Request::new(&verb.to_uppercase(), "/")).await;
        assert_eq!(resp.status_code(), StatusCode::OK, "{verb}");
        assert_eq!(resp.json_body().unwrap(), json!({ "response": verb }));
        assert_eq!(resp.header("content-type"), Some("application/json"));
    }
}

#[tokio::test]
async fn undeclared_verb_is_405_with_allow() {
    let resp = app().call(Request::new("HEAD", "/")).await;
    assert_eq!(resp.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.header("allow"), Some("DELETE, GET, PATCH, POST, PUT"));
    assert_eq!(
        resp.json_body().unwrap(),
        json!({ "message": "The method is not allowed for the requested URL." })
    );
}

#[tokio::test]
async fn finished_responses_pass_through() {
    let resp = app().call(Request::new("GET", "/response")).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    assert_eq!(resp.body(), br#"{"response":"get"}"#);
}

#[tokio::test]
async fn unknown_url_is_404() {
    let resp = app().call(Request::new("GET", "/nowhere")).await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_and_headers_from_the_handler_survive() {
    let resource = Resource::new("created").post(|_req: Request| async {
        (json!({ "id": 3 }), StatusCode::CREATED, vec![("location".to_owned(), "/todos/3".to_owned())])
    });
    let router = Api::new().add_resource(resource, &["/todos"]).register(Router::new());

    let resp = router.call(Request::new("POST", "/todos")).await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
    assert_eq!(resp.header("location"), Some("/todos/3"));
}

#[tokio::test]
async fn handler_errors_become_json_messages() {
    let resource = Resource::new("todo").get(|req: Request| async move {
        let id = req.param("id").unwrap_or_default().to_owned();
        Err::<Value, _>(Error::abort(StatusCode::NOT_FOUND, format!("Todo {id} doesn't exist")))
    });
    let router = Api::new().add_resource(resource, &["/todos/{id}"]).register(Router::new());

    let resp = router.call(Request::new("GET", "/todos/todo9")).await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(resp.json_body().unwrap(), json!({ "message": "Todo todo9 doesn't exist" }));
}

#[tokio::test]
async fn method_decorators_wrap_only_their_verb() {
    let login_required = Middleware::new(|req: Request, next: Next| async move {
        if req.header("authorization").is_none() {
            return Reply::Error(Error::abort(StatusCode::UNAUTHORIZED, "login required"));
        }
        next.run(req).await
    });
    let resource = Resource::new("login")
        .get(|_req: Request| async { json!({ "message": "ok" }) })
        .put(|_req: Request| async { json!({ "message": "open" }) })
        .decorate(Method::Get, login_required);
    let router = Api::new().add_resource(resource, &["/login"]).register(Router::new());

    let denied = router.call(Request::new("GET", "/login")).await;
    assert_eq!(denied.status_code(), StatusCode::UNAUTHORIZED);

    let allowed = router
        .call(Request::new("GET", "/login").with_header("Authorization", "Bearer t"))
        .await;
    assert_eq!(allowed.json_body().unwrap(), json!({ "message": "ok" }));

    let open = router.call(Request::new("PUT", "/login")).await;
    assert_eq!(open.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn api_decorators_wrap_every_resource() {
    let stamp = Middleware::map_reply(|reply| reply.with_header("x-api", "v1"));
    let router = Api::new()
        .decorator(stamp)
        .add_resource(every_verb(), &["/"])
        .add_resource(Resource::new("other").get(|_req: Request| async { "other" }), &["/other"])
        .register(Router::new());

    for path in ["/", "/other"] {
        let resp = router.call(Request::new("GET", path)).await;
        assert_eq!(resp.header("x-api"), Some("v1"), "{path}");
    }
}

#[tokio::test]
async fn prefix_applies_to_every_url() {
    let router = Api::new()
        .prefix("/api/v1")
        .add_resource(every_verb(), &["/things"])
        .register(Router::new());
    assert_eq!(router.call(Request::new("GET", "/api/v1/things")).await.status_code(), StatusCode::OK);
    assert_eq!(router.call(Request::new("GET", "/things")).await.status_code(), StatusCode::NOT_FOUND);
}

fn xml(data: &Value, status: StatusCode, headers: &[(String, String)]) -> Result<Response, Error> {
    let body = match data {
        Value::Object(map) => map.iter()
            .map(|(k, v)| format!("<{k}>{}</{k}>", v.as_str().map_or_else(|| v.to_string(), str::to_owned)))
            .collect::<String>(),
        other => other.to_string(),
    };
    Ok(Response::builder()
        .status(status)
        .headers(headers)
        .bytes("application/xml", format!("<response>{body}</response>").into_bytes()))
}

#[tokio::test]
async fn accept_header_selects_the_representation() {
    let router = Api::new()
        .representation("application/xml", xml)
        .add_resource(every_verb(), &["/"])
        .register(Router::new());

    let resp = router.call(Request::new("GET", "/").with_header("accept", "application/xml")).await;
    assert_eq!(resp.header("content-type"), Some("application/xml"));
    assert_eq!(resp.body(), b"<response><response>get</response></response>");

    let resp = router.call(Request::new("GET", "/").with_header("accept", "application/json; charset=utf-8")).await;
    assert_eq!(resp.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn unmatched_accept_uses_the_default_mediatype() {
    let resp = app().call(Request::new("GET", "/").with_header("accept", "text/html")).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    assert_eq!(resp.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn unmatched_accept_without_default_is_406() {
    let router = Api::new()
        .default_mediatype(None)
        .add_resource(every_verb(), &["/"])
        .register(Router::new());

    let resp = router.call(Request::new("GET", "/").with_header("accept", "text/html")).await;
    assert_eq!(resp.status_code(), StatusCode::NOT_ACCEPTABLE);

    let resp = router.call(Request::new("GET", "/").with_header("accept", "*/*")).await;
    assert_eq!(resp.status_code(), StatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn json_settings_reformat_output() {
    let router = Api::new()
        .json_settings(JsonSettings { indent: Some(4), sort_keys: true })
        .add_resource(
            Resource::new("pretty").get(|_req: Request| async { json!({ "b": 1, "a": 2 }) }),
            &["/"],
        )
        .register(Router::new());

    let resp = router.call(Request::new("GET", "/")).await;
    assert_eq!(resp.body(), b"{\n    \"a\": 2,\n    \"b\": 1\n}\n");
}

#[tokio::test]
async fn negotiated_mediatype_is_the_only_content_type() {
    let resource = Resource::new("vendor").get(|_req: Request| async {
        (
            json!({ "id": 1 }),
            StatusCode::OK,
            vec![("Content-Type".to_owned(), "application/vnd.x+json".to_owned())],
        )
    });
    let router = Api::new()
        .representation("application/vnd.api+json", tsu_restful::json_writer(JsonSettings::default()))
        .add_resource(resource, &["/"])
        .register(Router::new());

    let resp = router.call(Request::new("GET", "/").with_header("accept", "application/vnd.api+json")).await;
    assert_eq!(resp.header("content-type"), Some("application/vnd.api+json"));
    let content_types: Vec<_> = resp.headers().iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .collect();
    assert_eq!(content_types.len(), 1);

    let resp = router.call(Request::new("GET", "/")).await;
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(resp.json_body().unwrap(), json!({ "id": 1 }));
}

#[tokio::test]
async fn resource_representations_come_before_the_api_registry() {
    let with_xml = Resource::new("with_xml")
        .get(|_req: Request| async { json!({ "response": "get" }) })
        .representation("application/xml", xml);
    let plain = Resource::new("plain").get(|_req: Request| async { json!({ "response": "get" }) });
    let router = Api::new()
        .add_resource(with_xml, &["/xml"])
        .add_resource(plain, &["/plain"])
        .register(Router::new());

    let accept_xml = |path| Request::new("GET", path).with_header("accept", "application/xml");

    let resp = router.call(accept_xml("/xml")).await;
    assert_eq!(resp.header("content-type"), Some("application/xml"));
    assert_eq!(resp.body(), b"<response><response>get</response></response>");

    let resp = router.call(accept_xml("/plain")).await;
    assert_eq!(resp.header("content-type"), Some("application/json"));

    let resp = router.call(Request::new("GET", "/xml")).await;
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(resp.json_body().unwrap(), json!({ "response": "get" }));
}
