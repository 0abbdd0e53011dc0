//! Occurrence: one materialized child task for a single due date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::{OccurrenceId, TemplateId};
use super::template::{TaskAttributes, TemplateTask};

/// A generated task.
///
/// `(template_ref, occurrence_date)` is unique across all occurrences; the
/// backing store enforces it. Deleting the template nulls `template_ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: OccurrenceId,
    pub template_ref: Option<TemplateId>,
    pub parent: Option<TemplateId>,
    pub occurrence_date: NaiveDate,
    pub name: String,
    pub attributes: TaskAttributes,
}

/// Occurrence before the store assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOccurrence {
    pub template_id: TemplateId,
    pub occurrence_date: NaiveDate,
    pub name: String,
    pub attributes: TaskAttributes,
}

impl NewOccurrence {
    /// Copy the shareable parts of `template`. Sub-items stay with the template.
    pub fn from_template(template: &TemplateTask, occurrence_date: NaiveDate) -> Self {
        Self {
            template_id: template.id,
            occurrence_date,
            name: format!("{} - {}", template.name, occurrence_date.format("%Y-%m-%d")),
            attributes: template.attributes.clone(),
        }
    }

    pub fn into_occurrence(self, id: OccurrenceId) -> Occurrence {
        Occurrence {
            id,
            template_ref: Some(self.template_id),
            parent: Some(self.template_id),
            occurrence_date: self.occurrence_date,
            name: self.name,
            attributes: self.attributes,
        }
    }
}
