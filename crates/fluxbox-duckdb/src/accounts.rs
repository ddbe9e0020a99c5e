use anyhow::Result;

use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Return the stored plan id for `user_id`, or `None` if the user never
    /// changed plan.
    pub async fn get_user_plan(&self, user_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT plan_id FROM user_plans WHERE user_id = ?1")?;
        match stmt.query_row(duckdb::params![user_id], |row| row.get::<_, String>(0)) {
            Ok(plan_id) => Ok(Some(plan_id)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow::anyhow!(e)),
        }
    }

    /// Upsert the plan for `user_id`. Last committed write wins.
    pub async fn set_user_plan(&self, user_id: &str, plan_id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO user_plans (user_id, plan_id, updated_at)
               VALUES (?1, ?2, CURRENT_TIMESTAMP)
               ON CONFLICT (user_id) DO UPDATE SET
                   plan_id = EXCLUDED.plan_id,
                   updated_at = EXCLUDED.updated_at"#,
            duckdb::params![user_id, plan_id],
        )?;
        tracing::info!(user_id, plan_id, "User plan updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_has_no_plan() {
        let db = DuckDbBackend::open_in_memory().expect("open");
        assert_eq!(db.get_user_plan("user_x").await.expect("get"), None);
    }

    #[tokio::test]
    async fn set_user_plan_overwrites() {
        let db = DuckDbBackend::open_in_memory().expect("open");
        db.set_user_plan("user_a", "pro-50").await.expect("set");
        db.set_user_plan("user_a", "pro-100").await.expect("set");
        db.set_user_plan("user_b", "basic").await.expect("set");
        assert_eq!(
            db.get_user_plan("user_a").await.expect("get").as_deref(),
            Some("pro-100")
        );
        assert_eq!(
            db.get_user_plan("user_b").await.expect("get").as_deref(),
            Some("basic")
        );
    }
}
