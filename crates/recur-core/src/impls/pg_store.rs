//! PgTemplateStore - PostgreSQL 実装（`postgres` feature）
//!
//! - claim は `UPDATE ... WHERE cursor_date = $expected RETURNING id` の 1 文
//! - 一意性は `uniq_template_occurrence` 制約が保証する
//! - テンプレート削除時は外部キーの `ON DELETE SET NULL` で参照を外す

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;

use crate::domain::ids::{Id, IdMarker, ParseIdError, Template};
use crate::domain::{
    NewOccurrence, Occurrence, RecurrenceRule, SeriesState, StoreError, TaskAttributes,
    TemplateId, TemplateTask,
};
use crate::ports::{IdGenerator, SystemClock, TemplateStore, UlidGenerator};

const SCHEMA: &str = include_str!("../../migrations/0001_recurrence.sql");

const TEMPLATE_COLUMNS: &str =
    "id, name, attributes, subtasks, rule, is_active, cursor_date, remaining";

const OCCURRENCE_COLUMNS: &str = "id, template_id, parent_id, occurrence_date, name, attributes";

pub struct PgTemplateStore {
    pool: PgPool,
    ids: Arc<dyn IdGenerator>,
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn parse_id<T: IdMarker>(raw: &str) -> Result<Id<T>, StoreError> {
    raw.parse()
        .map_err(|err: ParseIdError| StoreError::Backend(err.to_string()))
}

fn to_db_count(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn template_from_row(row: &PgRow) -> Result<TemplateTask, StoreError> {
    let id: String = row.try_get("id").map_err(backend)?;
    let Json(attributes): Json<TaskAttributes> = row.try_get("attributes").map_err(backend)?;
    let Json(subtasks): Json<Vec<String>> = row.try_get("subtasks").map_err(backend)?;
    let Json(rule): Json<RecurrenceRule> = row.try_get("rule").map_err(backend)?;
    let active: bool = row.try_get("is_active").map_err(backend)?;
    let cursor: Option<NaiveDate> = row.try_get("cursor_date").map_err(backend)?;
    let remaining: Option<i32> = row.try_get("remaining").map_err(backend)?;

    Ok(TemplateTask {
        id: parse_id(&id)?,
        name: row.try_get("name").map_err(backend)?,
        attributes,
        subtasks,
        rule,
        series: SeriesState::from_parts(
            active,
            cursor,
            remaining.map(|left| left.max(0) as u32),
        ),
    })
}

fn occurrence_from_row(row: &PgRow) -> Result<Occurrence, StoreError> {
    let id: String = row.try_get("id").map_err(backend)?;
    let template_ref: Option<String> = row.try_get("template_id").map_err(backend)?;
    let parent: Option<String> = row.try_get("parent_id").map_err(backend)?;
    let Json(attributes): Json<TaskAttributes> = row.try_get("attributes").map_err(backend)?;

    Ok(Occurrence {
        id: parse_id(&id)?,
        template_ref: template_ref.as_deref().map(parse_id::<Template>).transpose()?,
        parent: parent.as_deref().map(parse_id::<Template>).transpose()?,
        occurrence_date: row.try_get("occurrence_date").map_err(backend)?,
        name: row.try_get("name").map_err(backend)?,
        attributes,
    })
}

impl PgTemplateStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(backend)?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            ids: Arc::new(UlidGenerator::new(SystemClock)),
        }
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for PgTemplateStore {
    async fn due_templates(&self, today: NaiveDate) -> Result<Vec<TemplateTask>, StoreError> {
        let sql = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM recurring_templates \
             WHERE is_active AND cursor_date IS NOT NULL AND cursor_date <= $1 \
             ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(today)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(template_from_row).collect()
    }

    async fn init_remaining(&self, id: TemplateId, count: u32) -> Result<u32, StoreError> {
        let row = sqlx::query(
            "UPDATE recurring_templates SET remaining = COALESCE(remaining, $2) \
             WHERE id = $1 RETURNING remaining",
        )
        .bind(id.to_string())
        .bind(to_db_count(count))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::TemplateNotFound(id))?;

        let remaining: Option<i32> = row.try_get("remaining").map_err(backend)?;
        Ok(remaining.map_or(count, |left| left.max(0) as u32))
    }

    async fn claim_cursor(
        &self,
        id: TemplateId,
        expected: NaiveDate,
        next: NaiveDate,
    ) -> Result<bool, StoreError> {
        let claimed = sqlx::query(
            "UPDATE recurring_templates SET cursor_date = $3 \
             WHERE id = $1 AND is_active AND cursor_date = $2 RETURNING id",
        )
        .bind(id.to_string())
        .bind(expected)
        .bind(next)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(claimed.is_some())
    }

    async fn create_occurrence(
        &self,
        occurrence: NewOccurrence,
    ) -> Result<Occurrence, StoreError> {
        let template_id = occurrence.template_id;
        let date = occurrence.occurrence_date;
        let created = occurrence.into_occurrence(self.ids.occurrence_id());

        let result = sqlx::query(
            "INSERT INTO occurrences (id, template_id, parent_id, occurrence_date, name, attributes) \
             VALUES ($1, $2, $2, $3, $4, $5)",
        )
        .bind(created.id.to_string())
        .bind(template_id.to_string())
        .bind(date)
        .bind(&created.name)
        .bind(Json(&created.attributes))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(created),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateOccurrence { template_id, date })
            }
            Err(err) => Err(backend(err)),
        }
    }

    async fn consume_repetition(&self, id: TemplateId) -> Result<u32, StoreError> {
        let row = sqlx::query(
            "UPDATE recurring_templates \
             SET remaining = GREATEST(COALESCE(remaining, 0) - 1, 0) \
             WHERE id = $1 RETURNING remaining",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::TemplateNotFound(id))?;

        let remaining: Option<i32> = row.try_get("remaining").map_err(backend)?;
        Ok(remaining.unwrap_or(0).max(0) as u32)
    }

    async fn end_series(&self, id: TemplateId) -> Result<(), StoreError> {
        let done = sqlx::query(
            "UPDATE recurring_templates SET is_active = FALSE, cursor_date = NULL WHERE id = $1",
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if done.rows_affected() == 0 {
            return Err(StoreError::TemplateNotFound(id));
        }
        Ok(())
    }

    async fn insert_template(&self, template: TemplateTask) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO recurring_templates \
             (id, name, attributes, subtasks, rule, is_active, cursor_date, remaining) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(template.id.to_string())
        .bind(&template.name)
        .bind(Json(&template.attributes))
        .bind(Json(&template.subtasks))
        .bind(Json(&template.rule))
        .bind(template.series.is_active())
        .bind(template.series.cursor())
        .bind(template.series.remaining().map(to_db_count))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get_template(&self, id: TemplateId) -> Result<TemplateTask, StoreError> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM recurring_templates WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::TemplateNotFound(id))?;
        template_from_row(&row)
    }

    async fn update_schedule(
        &self,
        id: TemplateId,
        rule: RecurrenceRule,
        series: SeriesState,
    ) -> Result<(), StoreError> {
        let done = sqlx::query(
            "UPDATE recurring_templates \
             SET rule = $2, is_active = $3, cursor_date = $4, remaining = $5 \
             WHERE id = $1",
        )
        .bind(id.to_string())
        .bind(Json(&rule))
        .bind(series.is_active())
        .bind(series.cursor())
        .bind(series.remaining().map(to_db_count))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if done.rows_affected() == 0 {
            return Err(StoreError::TemplateNotFound(id));
        }
        Ok(())
    }

    async fn delete_template(&self, id: TemplateId) -> Result<(), StoreError> {
        let done = sqlx::query("DELETE FROM recurring_templates WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if done.rows_affected() == 0 {
            return Err(StoreError::TemplateNotFound(id));
        }
        Ok(())
    }

    async fn occurrences_of(&self, id: TemplateId) -> Result<Vec<Occurrence>, StoreError> {
        let sql = format!(
            "SELECT {OCCURRENCE_COLUMNS} FROM occurrences \
             WHERE template_id = $1 ORDER BY occurrence_date"
        );
        let rows = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(occurrence_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL database in DATABASE_URL"]
    async fn claim_and_unique_create_against_postgres() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let store = PgTemplateStore::connect(&url).await.unwrap();
        store.migrate().await.unwrap();

        let mut series = SeriesState::inactive();
        series.schedule(Some(date(2024, 1, 1)));
        let template = TemplateTask {
            id: TemplateId::generate(),
            name: "pg".to_string(),
            attributes: TaskAttributes::default(),
            subtasks: vec![],
            rule: RecurrenceRule::daily(1, date(2024, 1, 1)),
            series,
        };
        store.insert_template(template.clone()).await.unwrap();

        assert!(
            store
                .claim_cursor(template.id, date(2024, 1, 1), date(2024, 1, 2))
                .await
                .unwrap()
        );
        assert!(
            !store
                .claim_cursor(template.id, date(2024, 1, 1), date(2024, 1, 2))
                .await
                .unwrap()
        );

        let new = NewOccurrence::from_template(&template, date(2024, 1, 1));
        store.create_occurrence(new.clone()).await.unwrap();
        assert!(matches!(
            store.create_occurrence(new).await,
            Err(StoreError::DuplicateOccurrence { .. })
        ));

        store.delete_template(template.id).await.unwrap();
    }
}
