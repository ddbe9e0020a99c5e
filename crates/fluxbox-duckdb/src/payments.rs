use anyhow::Result;
use serde::Serialize;

use crate::backend::rand_hex;
use crate::DuckDbBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "confirmed" => Ok(PaymentStatus::Confirmed),
            other => Err(anyhow::anyhow!("unknown payment status in store: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub amount_minor_units: u64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: String,
    pub confirmed_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentIntent {
    pub user_id: String,
    pub plan_id: String,
    pub amount_minor_units: u64,
    pub currency: String,
}

/// Generate a payment intent ID: "pi_" + 24 random hex chars.
fn generate_intent_id() -> String {
    format!("pi_{}", rand_hex(12))
}

const SELECT_INTENT: &str = "SELECT id, user_id, plan_id, amount_minor_units, currency, status, \
     CAST(created_at AS VARCHAR), CAST(confirmed_at AS VARCHAR) \
     FROM payment_intents WHERE id = ?1";

fn read_intent(conn: &duckdb::Connection, id: &str) -> Result<Option<PaymentIntent>> {
    let mut stmt = conn.prepare(SELECT_INTENT)?;
    let row = stmt.query_row(duckdb::params![id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, Option<String>>(7)?,
        ))
    });
    let (id, user_id, plan_id, amount, currency, status, created_at, confirmed_at) = match row {
        Ok(v) => v,
        Err(duckdb::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(anyhow::anyhow!(e)),
    };
    Ok(Some(PaymentIntent {
        id,
        user_id,
        plan_id,
        amount_minor_units: u64::try_from(amount)?,
        currency,
        status: PaymentStatus::parse(&status)?,
        created_at,
        confirmed_at,
    }))
}

impl DuckDbBackend {
    pub async fn create_payment_intent(&self, params: NewPaymentIntent) -> Result<PaymentIntent> {
        let conn = self.conn.lock().await;
        let id = generate_intent_id();
        conn.execute(
            "INSERT INTO payment_intents (id, user_id, plan_id, amount_minor_units, currency, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', CURRENT_TIMESTAMP)",
            duckdb::params![
                id,
                params.user_id,
                params.plan_id,
                i64::try_from(params.amount_minor_units)?,
                params.currency
            ],
        )?;

        // Read back the created row to get timestamps.
        read_intent(&conn, &id)?
            .ok_or_else(|| anyhow::anyhow!("payment intent {id} missing after insert"))
    }

    pub async fn get_payment_intent(&self, id: &str) -> Result<Option<PaymentIntent>> {
        let conn = self.conn.lock().await;
        read_intent(&conn, id)
    }

    /// Confirm a pending intent and grant its plan, atomically.
    ///
    /// The status flip and the `user_plans` upsert run in one transaction, so
    /// an entitlement is never granted without the intent being marked, and
    /// vice versa. Returns `false` (and changes nothing) when the intent was
    /// already confirmed, which makes duplicate confirmation callbacks no-ops.
    pub async fn confirm_payment_intent(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let claimed = tx.execute(
            "UPDATE payment_intents SET status = 'confirmed', confirmed_at = CURRENT_TIMESTAMP \
             WHERE id = ?1 AND status = 'pending'",
            duckdb::params![id],
        )?;
        if claimed == 0 {
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM payment_intents WHERE id = ?1",
                duckdb::params![id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                anyhow::bail!("payment intent {id} not found");
            }
            tracing::info!(intent_id = id, "Duplicate payment confirmation, skipping");
            return Ok(false);
        }

        let (user_id, plan_id): (String, String) = tx.query_row(
            "SELECT user_id, plan_id FROM payment_intents WHERE id = ?1",
            duckdb::params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        tx.execute(
            r#"INSERT INTO user_plans (user_id, plan_id, updated_at)
               VALUES (?1, ?2, CURRENT_TIMESTAMP)
               ON CONFLICT (user_id) DO UPDATE SET
                   plan_id = EXCLUDED.plan_id,
                   updated_at = EXCLUDED.updated_at"#,
            duckdb::params![user_id, plan_id],
        )?;
        tx.commit()?;
        tracing::info!(intent_id = id, user_id, plan_id, "Payment intent confirmed and plan applied");
        Ok(true)
    }
}
