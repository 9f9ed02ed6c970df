//! Project and task management tools, forwarded to the project service

use crate::context::ServerContext;
use crate::error::{BridgeError, Result};
use crate::mcp::registry::{parse_args, ToolDefinition, ToolModule};
use crate::services::{NewProject, NewTask, TaskFilter, TaskUpdate};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::forwarded;

/// Accepted task status values
pub const TASK_STATUSES: [&str; 4] = ["todo", "doing", "review", "done"];

pub struct ProjectTools;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectIdArgs {
    project_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateProjectArgs {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    github_repo: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListTasksArgs {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateTaskArgs {
    project_id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    assignee: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateTaskArgs {
    task_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    assignee: Option<String>,
}

#[async_trait]
impl ToolModule for ProjectTools {
    fn name(&self) -> &'static str {
        "projects"
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        let status = json!({"type": "string", "enum": TASK_STATUSES});
        vec![
            ToolDefinition::new(
                "list_projects",
                "List all projects.",
                json!({ "type": "object", "properties": {} }),
            ),
            ToolDefinition::new(
                "get_project",
                "Get a single project by id.",
                json!({
                    "type": "object",
                    "properties": {"project_id": {"type": "string"}},
                    "required": ["project_id"]
                }),
            ),
            ToolDefinition::new(
                "create_project",
                "Create a new project.",
                json!({
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "description": {"type": "string"},
                        "github_repo": {"type": "string"}
                    },
                    "required": ["title"]
                }),
            ),
            ToolDefinition::new(
                "list_tasks",
                "List tasks, optionally filtered by project and status.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": {"type": "string"},
                        "status": status.clone()
                    }
                }),
            ),
            ToolDefinition::new(
                "create_task",
                "Create a task in a project.",
                json!({
                    "type": "object",
                    "properties": {
                        "project_id": {"type": "string"},
                        "title": {"type": "string"},
                        "description": {"type": "string"},
                        "assignee": {"type": "string"}
                    },
                    "required": ["project_id", "title"]
                }),
            ),
            ToolDefinition::new(
                "update_task",
                "Update fields of an existing task.",
                json!({
                    "type": "object",
                    "properties": {
                        "task_id": {"type": "string"},
                        "title": {"type": "string"},
                        "description": {"type": "string"},
                        "status": status,
                        "assignee": {"type": "string"}
                    },
                    "required": ["task_id"]
                }),
            ),
        ]
    }

    async fn call(&self, tool: &str, ctx: &ServerContext, args: Value) -> Result<Value> {
        let projects = &ctx.projects;
        let outcome = match tool {
            "list_projects" => {
                let _: NoArgs = parse_args(tool, args)?;
                projects.list_projects().await
            }
            "get_project" => {
                let args: ProjectIdArgs = parse_args(tool, args)?;
                require_non_empty("project_id", &args.project_id)?;
                projects.get_project(args.project_id).await
            }
            "create_project" => {
                let args: CreateProjectArgs = parse_args(tool, args)?;
                require_non_empty("title", &args.title)?;
                projects
                    .create_project(NewProject {
                        title: args.title,
                        description: args.description,
                        github_repo: args.github_repo,
                    })
                    .await
            }
            "list_tasks" => {
                let args: ListTasksArgs = parse_args(tool, args)?;
                validate_status(args.status.as_deref())?;
                projects
                    .list_tasks(TaskFilter {
                        project_id: args.project_id,
                        status: args.status,
                    })
                    .await
            }
            "create_task" => {
                let args: CreateTaskArgs = parse_args(tool, args)?;
                require_non_empty("project_id", &args.project_id)?;
                require_non_empty("title", &args.title)?;
                projects
                    .create_task(NewTask {
                        project_id: args.project_id,
                        title: args.title,
                        description: args.description,
                        assignee: args.assignee,
                    })
                    .await
            }
            "update_task" => {
                let args: UpdateTaskArgs = parse_args(tool, args)?;
                require_non_empty("task_id", &args.task_id)?;
                validate_status(args.status.as_deref())?;
                let update = TaskUpdate {
                    title: args.title,
                    description: args.description,
                    status: args.status,
                    assignee: args.assignee,
                };
                if update.is_empty() {
                    return Err(BridgeError::InvalidParams(
                        "update_task needs at least one field to change".to_string(),
                    ));
                }
                projects.update_task(args.task_id, update).await
            }
            _ => return Err(BridgeError::ToolNotFound(tool.to_string())),
        };

        Ok(forwarded(tool, outcome))
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BridgeError::InvalidParams(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

fn validate_status(status: Option<&str>) -> Result<()> {
    match status {
        Some(s) if !TASK_STATUSES.contains(&s) => Err(BridgeError::InvalidParams(format!(
            "status must be one of {}, got {}",
            TASK_STATUSES.join("|"),
            s
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::services::{MockKnowledgeService, MockProjectService};
    use std::sync::Arc;

    fn context(projects: MockProjectService) -> ServerContext {
        ServerContext::new(
            BridgeConfig::default(),
            Arc::new(MockKnowledgeService::new()),
            Arc::new(projects),
        )
    }

    #[tokio::test]
    async fn test_create_task_forwards_fields() {
        let mut projects = MockProjectService::new();
        projects
            .expect_create_task()
            .withf(|task| task.project_id == "p1" && task.title == "Write docs")
            .returning(|_| Ok(json!({"task": {"id": "t1"}})));
        let ctx = context(projects);

        let result = ProjectTools
            .call(
                "create_task",
                &ctx,
                json!({"project_id": "p1", "title": "Write docs"}),
            )
            .await
            .unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["task"]["id"], "t1");
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let ctx = context(MockProjectService::new());
        let err = ProjectTools
            .call("update_task", &ctx, json!({"task_id": "t1", "status": "blocked"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("todo|doing|review|done"));

        let err = ProjectTools
            .call("list_tasks", &ctx, json!({"status": "archived"}))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_update_requires_a_field() {
        let ctx = context(MockProjectService::new());
        let err = ProjectTools
            .call("update_task", &ctx, json!({"task_id": "t1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_list_projects_wraps_arrays() {
        let mut projects = MockProjectService::new();
        projects
            .expect_list_projects()
            .returning(|| Ok(json!([{"id": "p1"}])));
        let ctx = context(projects);

        let result = ProjectTools.call("list_projects", &ctx, json!({})).await.unwrap();
        assert_eq!(result["result"][0]["id"], "p1");
    }

    #[tokio::test]
    async fn test_upstream_error_is_soft() {
        let mut projects = MockProjectService::new();
        projects.expect_get_project().returning(|_| {
            Err(BridgeError::Upstream {
                status: 404,
                body: "no such project".into(),
            })
        });
        let ctx = context(projects);

        let result = ProjectTools
            .call("get_project", &ctx, json!({"project_id": "nope"}))
            .await
            .unwrap();
        assert_eq!(result["success"], false);
    }
}
