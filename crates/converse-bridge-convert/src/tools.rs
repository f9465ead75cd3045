//! Tool configuration
//!
//! Builds the `toolConfig` section from generic tool declarations. Declared
//! names are reduced to what the API accepts; the resulting [`ToolNameMap`]
//! translates between caller and wire names in both directions.

use crate::profile::ModelProfile;
use crate::schema::{sanitize_function_name, sanitize_schema};
use converse_bridge_core::{
    Error, Result,
    chat::{ToolDeclaration, ToolMode},
    converse::{
        EmptyObject, SpecificToolChoice, Tool, ToolChoice, ToolConfiguration, ToolInputSchema,
        ToolSpecification,
    },
    tool_names::ToolNameMap,
};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedTools {
    /// `None` when no tools were declared
    pub config: Option<ToolConfiguration>,
    pub names: ToolNameMap,
}

/// Convert tool declarations and the tool-choice mode
pub fn build_tool_config(
    tools: &[ToolDeclaration],
    mode: ToolMode,
    profile: &ModelProfile,
) -> Result<PreparedTools> {
    if tools.is_empty() {
        if mode == ToolMode::Required {
            debug!("Required tool mode without tools, ignoring tool choice");
        }
        return Ok(PreparedTools::default());
    }

    if mode == ToolMode::Required && tools.len() > 1 {
        return Err(Error::ToolChoice(format!(
            "required tool mode needs exactly one tool, got {}",
            tools.len()
        )));
    }

    let mut names = ToolNameMap::new();
    let mut wire_owners: HashMap<String, &str> = HashMap::new();
    let mut specs = Vec::with_capacity(tools.len());

    for tool in tools {
        let wire_name = sanitize_function_name(&tool.name);
        if let Some(previous) = wire_owners.insert(wire_name.clone(), &tool.name) {
            return Err(Error::InvalidToolName(format!(
                "tools '{}' and '{}' both map to '{}'",
                previous, tool.name, wire_name
            )));
        }
        if wire_name != tool.name {
            debug!("Tool '{}' sent as '{}'", tool.name, wire_name);
        }
        names.insert(&tool.name, &wire_name);

        let description = tool
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        specs.push(Tool::ToolSpec(ToolSpecification {
            name: wire_name,
            description,
            input_schema: ToolInputSchema::Json(sanitize_schema(&tool.input_schema, None)),
        }));
    }

    let tool_choice = if !profile.supports_tool_choice {
        if mode == ToolMode::Required {
            warn!("Model does not support tool choice, required tool mode not enforced");
        }
        None
    } else {
        match mode {
            ToolMode::Auto => Some(ToolChoice::Auto(EmptyObject {})),
            ToolMode::Required => {
                let name = names.wire(&tools[0].name).to_string();
                Some(ToolChoice::Tool(SpecificToolChoice { name }))
            }
        }
    };

    Ok(PreparedTools {
        config: Some(ToolConfiguration {
            tools: specs,
            tool_choice,
        }),
        names,
    })
}
