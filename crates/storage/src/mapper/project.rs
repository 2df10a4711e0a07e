use tracegraph_core::{Project, Workspace};

use super::codec::{NodeReader, NodeWriter};
use super::props::*;
use crate::error::Result;
use crate::property::PropertyMap;

pub fn encode_workspace(workspace: &Workspace) -> PropertyMap {
    NodeWriter::new("Workspace")
        .value(ID, workspace.id.as_str())
        .value(NAME, workspace.name.as_str())
        .timestamp(CREATED_AT, Some(&workspace.created_at))
        .finish()
}

pub fn decode_workspace(props: &PropertyMap) -> Result<Workspace> {
    let node = NodeReader::new("Workspace", props)?;
    Ok(Workspace {
        id: node.id().to_string(),
        name: node.string(NAME)?,
        created_at: node.timestamp(CREATED_AT)?,
    })
}

pub fn encode_project(project: &Project) -> PropertyMap {
    NodeWriter::new("Project")
        .value(ID, project.id.as_str())
        .value(WORKSPACE_ID, project.workspace_id.as_str())
        .value(NAME, project.name.as_str())
        .value(DESCRIPTION, project.description.clone())
        .timestamp(CREATED_AT, Some(&project.created_at))
        .value(CREATED_BY, project.created_by.as_str())
        .timestamp(LAST_UPDATED_AT, Some(&project.last_updated_at))
        .value(LAST_UPDATED_BY, project.last_updated_by.as_str())
        .finish()
}

pub fn decode_project(props: &PropertyMap) -> Result<Project> {
    let node = NodeReader::new("Project", props)?;
    Ok(Project {
        id: node.id().to_string(),
        workspace_id: node.string(WORKSPACE_ID)?,
        name: node.string(NAME)?,
        description: node.opt_string(DESCRIPTION)?,
        created_at: node.timestamp(CREATED_AT)?,
        created_by: node.string(CREATED_BY)?,
        last_updated_at: node.timestamp(LAST_UPDATED_AT)?,
        last_updated_by: node.string(LAST_UPDATED_BY)?,
    })
}
