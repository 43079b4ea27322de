//! Steps and the workflow definition they form.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::field::Field;
use crate::error::IntakeError;

/// One page of the multi-step intake form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based ordinal within the workflow.
    pub id: u32,
    pub title: String,
    pub fields: Vec<Field>,
}

impl Step {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The ordered, immutable sequence of steps. Built once at process start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workflow {
    pub name: String,
    steps: Vec<Step>,
}

impl Workflow {
    pub fn builder(name: &str) -> WorkflowBuilder {
        WorkflowBuilder {
            name: name.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, id: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Position of a step in the sequence.
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look up a field anywhere in the workflow.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.steps.iter().find_map(|s| s.field(name))
    }

    /// Every field, in step order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.steps.iter().flat_map(|s| s.fields.iter())
    }
}

/// Builder that assigns step ordinals and checks the definition.
pub struct WorkflowBuilder {
    name: String,
    steps: Vec<(String, Vec<Field>)>,
}

impl WorkflowBuilder {
    pub fn step(mut self, title: &str, fields: Vec<Field>) -> Self {
        self.steps.push((title.to_string(), fields));
        self
    }

    pub fn build(self) -> Result<Workflow, IntakeError> {
        if self.steps.is_empty() {
            return Err(IntakeError::Definition(format!(
                "workflow '{}' has no steps",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(self.steps.len());
        for (index, (title, fields)) in self.steps.into_iter().enumerate() {
            if fields.is_empty() {
                return Err(IntakeError::Definition(format!("step '{title}' has no fields")));
            }
            for field in &fields {
                if !seen.insert(field.name.clone()) {
                    return Err(IntakeError::Definition(format!(
                        "field '{}' is declared more than once",
                        field.name
                    )));
                }
            }
            steps.push(Step {
                id: index as u32 + 1,
                title,
                fields,
            });
        }

        Ok(Workflow {
            name: self.name,
            steps,
        })
    }
}
