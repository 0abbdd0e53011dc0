//! Domain model: ids, rules, templates, occurrences, events, errors.

pub mod errors;
pub mod events;
pub mod ids;
pub mod occurrence;
pub mod rule;
pub mod template;

pub use self::errors::{InvalidRule, NoteError, PassError, PassStage, StoreError};
pub use self::events::DomainEvent;
pub use self::ids::{OccurrenceId, TemplateId};
pub use self::occurrence::{NewOccurrence, Occurrence};
pub use self::rule::{RecurrenceRule, StopPolicy, Unit, WeekdayMask};
pub use self::template::{EndReason, SeriesState, TaskAttributes, TemplateDraft, TemplateTask};
