use anyhow::Result;
use async_trait::async_trait;
use domain::DomainError;
use domain::output::OutputId;
use domain::trigger::{TriggerClass, TriggerRule, TriggerRuleRepository};
use serde_json::json;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};
use tracing::warn;

/// Trigger rules kept in SQLite, one row per rule
#[derive(Clone)]
pub struct SqliteTriggerRuleRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTriggerRuleRepository {
    pub async fn new(pool: Pool<Sqlite>) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS trigger_rules (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                output_id TEXT NOT NULL,
                trigger_type TEXT NOT NULL,
                output_state TEXT NOT NULL,
                threshold REAL NOT NULL DEFAULT 0,
                is_activated INTEGER NOT NULL DEFAULT 1
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trigger_rules_output
             ON trigger_rules (output_id, trigger_type)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Enable or disable a rule without touching its condition
    pub async fn set_activated(&self, rule_id: &str, activated: bool) -> Result<(), DomainError> {
        sqlx::query("UPDATE trigger_rules SET is_activated = ? WHERE id = ?")
            .bind(activated)
            .bind(rule_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;
        Ok(())
    }

    fn to_rule(row: &SqliteRow) -> Result<TriggerRule, DomainError> {
        let trigger_type: String = row.get("trigger_type");
        let class: TriggerClass = trigger_type.parse()?;
        let threshold_key = match class {
            TriggerClass::Output => "output_duration",
            TriggerClass::OutputPwm => "output_duty_cycle",
        };

        let mut value = json!({
            "id": row.get::<String, _>("id"),
            "name": row.get::<String, _>("name"),
            "output_id": row.get::<String, _>("output_id"),
            "is_activated": row.get::<bool, _>("is_activated"),
            "trigger_type": trigger_type,
            "output_state": row.get::<String, _>("output_state"),
        });
        value[threshold_key] = json!(row.get::<f64, _>("threshold"));

        serde_json::from_value(value)
            .map_err(|e| DomainError::Repository(format!("Corrupt trigger rule row: {}", e)))
    }
}

#[async_trait]
impl TriggerRuleRepository for SqliteTriggerRuleRepository {
    async fn find_active(
        &self,
        output_id: &OutputId,
        class: TriggerClass,
    ) -> Result<Vec<TriggerRule>, DomainError> {
        let rows = sqlx::query(
            "SELECT id, name, output_id, trigger_type, output_state, threshold, is_activated
             FROM trigger_rules
             WHERE output_id = ? AND trigger_type = ? AND is_activated = 1",
        )
        .bind(output_id.as_str())
        .bind(class.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        // One unreadable row must not hide the valid rules of the output.
        Ok(rows
            .iter()
            .filter_map(|row| match Self::to_rule(row) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!(
                        output_id = %output_id,
                        class = class.as_str(),
                        error = %e,
                        "Skipping unreadable trigger rule"
                    );
                    None
                }
            })
            .collect())
    }

    async fn save(&self, rule: &TriggerRule) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO trigger_rules
                (id, name, output_id, trigger_type, output_state, threshold, is_activated)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                output_id = excluded.output_id,
                trigger_type = excluded.trigger_type,
                output_state = excluded.output_state,
                threshold = excluded.threshold,
                is_activated = excluded.is_activated",
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(rule.output_id.as_str())
        .bind(rule.class().as_str())
        .bind(rule.condition.state_str())
        .bind(rule.condition.threshold())
        .bind(rule.is_activated)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;
        Ok(())
    }
}
