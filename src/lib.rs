//! # tsu-restful
//!
//! Small building blocks for JSON REST APIs on hyper.
//!
//! - **Request parsing**: declare the arguments a handler expects and get
//!   them validated, converted and collected ([`reqparse`]).
//! - **Output marshaling**: declare the shape of a response and project any
//!   serializable value through it ([`fields`], [`marshal`]).
//! - **Resources**: group verb handlers under a name, wrap them in
//!   [`middleware`], and let an [`Api`] mount them on a [`Router`] with
//!   content negotiation on the way out.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use serde_json::{Value, json};
//! use tsu_restful::fields::{Field, Schema};
//! use tsu_restful::reqparse::{Argument, RequestParser};
//! use tsu_restful::{Api, Error, Method, Request, Resource, Router, Server, marshal_with};
//!
//! async fn get_todo(req: Request) -> Result<Value, Error> {
//!     let id = req.param("id").unwrap_or_default();
//!     if id != "1" {
//!         return Err(Error::abort(StatusCode::NOT_FOUND, format!("Todo {id} doesn't exist")));
//!     }
//!     Ok(json!({ "id": 1, "task": "build an API", "owner": "internal" }))
//! }
//!
//! async fn create_todo(req: Request) -> Result<(Value, StatusCode), Error> {
//!     let args = RequestParser::new()
//!         .add_argument(Argument::new("task").required(true))
//!         .parse_args(&req)?;
//!     Ok((json!({ "id": 2, "task": args["task"] }), StatusCode::CREATED))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let todo = Schema::new()
//!         .field("id", Field::integer())
//!         .field("task", Field::string());
//!
//!     let resource = Resource::new("todo")
//!         .get(get_todo)
//!         .post(create_todo)
//!         .decorate(Method::Get, marshal_with(todo, None));
//!
//!     let router = Api::new()
//!         .add_resource(resource, &["/todos/{id}", "/todos"])
//!         .register(Router::new());
//!
//!     Server::bind("0.0.0.0:5000").serve(router).await
//! }
//! ```

mod api;
mod error;
mod handler;
mod marshal;
mod method;
mod negotiate;
mod reply;
mod representation;
mod request;
mod resource;
mod response;
mod router;
mod server;

pub mod fields;
pub mod middleware;
pub mod reqparse;

pub use api::Api;
pub use error::Error;
pub use handler::{Handler, ResourceHandler};
pub use marshal::{marshal, marshal_with, marshal_with_field};
pub use method::{Method, UnknownMethod};
pub use negotiate::best_match;
pub use reply::{IntoReply, Reply};
pub use representation::{JsonSettings, Representations, Writer, json_writer, output_json};
pub use request::Request;
pub use resource::Resource;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
