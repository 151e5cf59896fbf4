//! Todo domain operations.
//!
//! Every operation is a pure function of its input. There is no backing store:
//! ids are not checked for existence and nothing is persisted.

pub mod ids;
pub mod types;

pub use ids::{IdGenerator, RandomIds};
pub use types::{CreateTodoRequest, DeleteTodoResponse, Todo, UpdateTodoRequest};

use crate::error::TodoError;

/// Parse a path id.
pub fn parse_id(raw: &str) -> Result<i64, TodoError> {
    raw.parse()
        .map_err(|_| TodoError::InvalidId(raw.to_string()))
}

/// The three sample todos.
pub fn list() -> Vec<Todo> {
    vec![
        Todo {
            id: 1,
            title: "Learn Docker".to_string(),
            completed: true,
        },
        Todo::new(2, "Learn Kubernetes"),
        Todo::new(3, "Learn Terraform"),
    ]
}

/// Build a new open todo from the request title.
pub fn create(request: CreateTodoRequest, ids: &dyn IdGenerator) -> Result<Todo, TodoError> {
    match request.title {
        Some(title) if !title.is_empty() => Ok(Todo::new(ids.next_id(), title)),
        _ => Err(TodoError::TitleRequired),
    }
}

/// Synthesize the todo for an id.
pub fn get(id: i64) -> Todo {
    Todo::placeholder(id)
}

/// Apply an update on top of the synthesized todo.
pub fn update(id: i64, request: UpdateTodoRequest) -> Todo {
    let title = request
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| types::default_title(id));

    Todo {
        id,
        title,
        completed: request.completed.unwrap_or(false),
    }
}

/// Confirm deletion of an id.
pub fn delete(id: i64) -> DeleteTodoResponse {
    DeleteTodoResponse {
        message: format!("Todo {id} deleted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_returns_three_samples_in_order() {
        let todos = list();
        let ids: Vec<_> = todos.iter().map(|t| t.id).collect();
        let done: Vec<_> = todos.iter().map(|t| t.completed).collect();

        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(done, vec![true, false, false]);
        assert_eq!(todos[1].title, "Learn Kubernetes");
    }

    #[test]
    fn create_requires_title() {
        let ids = || 1_i64;
        assert_eq!(
            create(CreateTodoRequest::default(), &ids),
            Err(TodoError::TitleRequired)
        );
        assert_eq!(
            create(CreateTodoRequest { title: Some(String::new()) }, &ids),
            Err(TodoError::TitleRequired)
        );
    }

    #[test]
    fn create_uses_injected_id() {
        let ids = || 417_i64;
        let todo = create(
            CreateTodoRequest {
                title: Some("Buy milk".into()),
            },
            &ids,
        )
        .unwrap();

        assert_eq!(todo, Todo::new(417, "Buy milk"));
    }

    #[test]
    fn get_synthesizes_placeholder() {
        assert_eq!(get(42), Todo::new(42, "Todo 42"));
    }

    #[test]
    fn update_defaults_when_absent() {
        assert_eq!(update(7, UpdateTodoRequest::default()), Todo::new(7, "Todo 7"));
    }

    #[test]
    fn update_applies_fields() {
        let todo = update(
            7,
            UpdateTodoRequest {
                title: Some("Ship it".into()),
                completed: Some(true),
            },
        );
        assert_eq!(
            todo,
            Todo {
                id: 7,
                title: "Ship it".into(),
                completed: true,
            }
        );
    }

    #[test]
    fn update_empty_title_falls_back() {
        let todo = update(
            3,
            UpdateTodoRequest {
                title: Some(String::new()),
                completed: Some(false),
            },
        );
        assert_eq!(todo, Todo::new(3, "Todo 3"));
    }

    #[test]
    fn delete_names_the_id() {
        assert_eq!(delete(5).message, "Todo 5 deleted");
    }

    #[test]
    fn parse_id_rejects_non_numeric() {
        assert_eq!(parse_id("42"), Ok(42));
        assert_eq!(parse_id("-3"), Ok(-3));
        assert_eq!(parse_id("abc"), Err(TodoError::InvalidId("abc".into())));
        assert_eq!(parse_id("42abc"), Err(TodoError::InvalidId("42abc".into())));
    }
}
