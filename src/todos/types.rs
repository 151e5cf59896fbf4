//! Todo payload types.

use serde::{Deserialize, Serialize};

/// A todo item. Built per request and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Todo id.
    pub id: i64,
    /// Todo title.
    pub title: String,
    /// Whether the todo is done.
    pub completed: bool,
}

impl Todo {
    /// Open todo with the given title.
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            completed: false,
        }
    }

    /// Open todo titled `Todo {id}`.
    pub fn placeholder(id: i64) -> Self {
        Self::new(id, default_title(id))
    }
}

/// Title used when none is supplied.
pub fn default_title(id: i64) -> String {
    format!("Todo {id}")
}

/// Body of `POST /api/todos`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateTodoRequest {
    /// Required, non-empty.
    #[serde(default)]
    pub title: Option<String>,
}

/// Body of `PUT /api/todos/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateTodoRequest {
    /// New title; absent or empty keeps the default.
    #[serde(default)]
    pub title: Option<String>,
    /// New completion flag; absent means `false`.
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Body returned by `DELETE /api/todos/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteTodoResponse {
    /// Confirmation text naming the id.
    pub message: String,
}
