//! A todo list API.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example todo
//!
//! Try:
//!   curl http://localhost:5000/todos
//!   curl http://localhost:5000/todos/todo1
//!   curl -X POST http://localhost:5000/todos -d 'task=something new'
//!   curl -X PUT http://localhost:5000/todos/todo3 -d 'task=something different'
//!   curl -X DELETE http://localhost:5000/todos/todo2
//!   curl -X PATCH http://localhost:5000/todos/todo1     # 405

use std::sync::{Arc, Mutex};

use http::StatusCode;
use indexmap::IndexMap;
use serde_json::{Value, json};
use tsu_restful::fields::{Field, Schema};
use tsu_restful::reqparse::{Argument, Location, RequestParser};
use tsu_restful::{Api, Error, Method, Request, Resource, Router, Server, marshal_with};

type Todos = Arc<Mutex<IndexMap<String, Value>>>;

fn task_parser() -> RequestParser {
    RequestParser::new()
        .trim(true)
        .add_argument(
            Argument::new("task")
                .location(Location::Form)
                .location(Location::Json)
                .required(true)
                .help("A task is required: {error_msg}"),
        )
}

fn lock(todos: &Todos) -> Result<std::sync::MutexGuard<'_, IndexMap<String, Value>>, Error> {
    todos.lock().map_err(|_| Error::abort(StatusCode::INTERNAL_SERVER_ERROR, "todo store poisoned"))
}

fn missing(id: &str) -> Error {
    Error::abort(StatusCode::NOT_FOUND, format!("Todo {id} doesn't exist"))
}

fn todo_resource(todos: Todos) -> Resource {
    let get = {
        let todos = Arc::clone(&todos);
        move |req: Request| {
            let todos = Arc::clone(&todos);
            async move {
                let id = req.param("todo_id").unwrap_or_default();
                lock(&todos)?.get(id).cloned().ok_or_else(|| missing(id))
            }
        }
    };
    let put = {
        let todos = Arc::clone(&todos);
        move |req: Request| {
            let todos = Arc::clone(&todos);
            async move {
                let args = task_parser().parse_args(&req)?;
                let task = json!({ "task": args["task"] });
                let id = req.param("todo_id").unwrap_or_default().to_owned();
                lock(&todos)?.insert(id, task.clone());
                Ok::<_, Error>((task, StatusCode::CREATED))
            }
        }
    };
    let delete = move |req: Request| {
        let todos = Arc::clone(&todos);
        async move {
            let id = req.param("todo_id").unwrap_or_default();
            lock(&todos)?.shift_remove(id).ok_or_else(|| missing(id))?;
            Ok::<_, Error>((json!(""), StatusCode::NO_CONTENT))
        }
    };

    let task = Schema::new().field("task", Field::string());
    Resource::new("Todo")
        .get(get)
        .put(put)
        .delete(delete)
        .decorate(Method::Get, marshal_with(task, None))
}

fn todo_list_resource(todos: Todos) -> Resource {
    let list = {
        let todos = Arc::clone(&todos);
        move |_req: Request| {
            let todos = Arc::clone(&todos);
            async move {
                let all: serde_json::Map<String, Value> = lock(&todos)?.clone().into_iter().collect();
                Ok::<_, Error>(Value::Object(all))
            }
        }
    };
    let create = move |req: Request| {
        let todos = Arc::clone(&todos);
        async move {
            let args = task_parser().parse_args(&req)?;
            let mut todos = lock(&todos)?;
            let id = format!("todo{}", todos.len() + 1);
            let task = json!({ "task": args["task"] });
            todos.insert(id, task.clone());
            Ok::<_, Error>((task, StatusCode::CREATED))
        }
    };

    Resource::new("TodoList").get(list).post(create)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let todos: Todos = Arc::new(Mutex::new(IndexMap::from([
        ("todo1".to_owned(), json!({ "task": "build an API" })),
        ("todo2".to_owned(), json!({ "task": "?????" })),
        ("todo3".to_owned(), json!({ "task": "profit!" })),
    ])));

    let router = Api::new()
        .add_resource(todo_list_resource(Arc::clone(&todos)), &["/todos"])
        .add_resource(todo_resource(todos), &["/todos/{todo_id}"])
        .register(Router::new());

    Server::bind("0.0.0.0:5000").serve(router).await
}
