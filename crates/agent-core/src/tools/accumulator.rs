use uuid::Uuid;

use crate::tools::{FunctionCall, ToolCall};

/// One streamed fragment of a tool invocation request.
///
/// Providers split a request over many chunks: the first fragment for an
/// `index` usually carries `id` and `name`, later ones only more `arguments`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialToolCall {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Reassembles streamed fragments into complete [`ToolCall`]s, in the order
/// the model first announced them.
#[derive(Debug, Default, Clone)]
pub struct ToolCallAccumulator {
    parts: Vec<PartialToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, delta: ToolCallDelta) {
        update_partial_tool_call(&mut self.parts, delta);
    }

    pub fn extend<I>(&mut self, deltas: I)
    where
        I: IntoIterator<Item = ToolCallDelta>,
    {
        for delta in deltas {
            self.update(delta);
        }
    }

    pub fn finalize(self) -> Vec<ToolCall> {
        finalize_tool_calls(self.parts)
    }

    pub fn parts(&self) -> &[PartialToolCall] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

pub fn update_partial_tool_call(parts: &mut Vec<PartialToolCall>, delta: ToolCallDelta) {
    let existing = parts.iter_mut().find(|part| part.index == delta.index);

    match existing {
        Some(part) => {
            if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
                part.id = id;
            }
            if let Some(name) = delta.name.filter(|name| !name.is_empty()) {
                part.name = name;
            }
            if let Some(arguments) = delta.arguments {
                part.arguments.push_str(&arguments);
            }
        }
        None => parts.push(PartialToolCall {
            index: delta.index,
            id: delta.id.unwrap_or_default(),
            name: delta.name.unwrap_or_default(),
            arguments: delta.arguments.unwrap_or_default(),
        }),
    }
}

pub fn finalize_tool_calls(parts: Vec<PartialToolCall>) -> Vec<ToolCall> {
    parts
        .into_iter()
        .filter(|part| !part.name.trim().is_empty())
        .map(|part| ToolCall {
            id: if part.id.is_empty() {
                format!("call_{}", Uuid::new_v4())
            } else {
                part.id
            },
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: part.name,
                arguments: part.arguments,
            },
        })
        .collect()
}
