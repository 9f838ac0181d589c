//! Execution of validated statements against the study-room database

use async_trait::async_trait;
use deadpool_postgres::{Object, Pool};
use postgres_types::{FromSql, Kind, Type};
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::time::Duration;
use thiserror::Error;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, Row};
use tracing::{debug, warn};

/// Delay before the single retry of a failed pool checkout
const CHECKOUT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Failure reported by the database while running a statement
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExecutionError(pub String);

/// Rows of a statement, each keyed by column name in driver order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Runs one read-only statement and materializes every row
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, statement: &str) -> Result<ResultSet, ExecutionError>;
}

/// Postgres-backed executor over the shared pool
pub struct PgExecutor {
    pool: Pool,
    timeout: Duration,
}

impl PgExecutor {
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Pool checkout is retried once; statement errors never are
    async fn checkout(&self) -> Result<Object, ExecutionError> {
        match self.pool.get().await {
            Ok(client) => Ok(client),
            Err(e) => {
                warn!("Pool checkout failed, retrying once: {}", e);
                tokio::time::sleep(CHECKOUT_RETRY_DELAY).await;
                self.pool
                    .get()
                    .await
                    .map_err(|e| ExecutionError(e.to_string()))
            }
        }
    }

    fn timed_out(&self) -> ExecutionError {
        ExecutionError(format!(
            "statement timed out after {}s",
            self.timeout.as_secs()
        ))
    }

    /// Prefer the server's message over the driver's wrapper text
    fn describe(&self, e: tokio_postgres::Error) -> ExecutionError {
        if e.code() == Some(&SqlState::QUERY_CANCELED) {
            return self.timed_out();
        }
        match e.as_db_error() {
            Some(db) => ExecutionError(db.message().to_string()),
            None => ExecutionError(e.to_string()),
        }
    }

    async fn run(&self, client: &Client, statement: &str) -> Result<ResultSet, ExecutionError> {
        // Extended protocol: one statement only, no implicit transaction
        let prepared = client
            .prepare(statement)
            .await
            .map_err(|e| self.describe(e))?;
        let rows = client
            .query(&prepared, &[])
            .await
            .map_err(|e| self.describe(e))?;

        let columns: Vec<String> = prepared
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = rows.iter().map(row_to_map).collect();

        Ok(ResultSet { columns, rows })
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn execute(&self, statement: &str) -> Result<ResultSet, ExecutionError> {
        let client = self.checkout().await?;

        let outcome = tokio::time::timeout(self.timeout, self.run(&client, statement)).await;
        let result = match outcome {
            Ok(result) => result?,
            Err(_) => {
                // The server may still be busy with the statement; close the
                // connection instead of handing it back to the pool
                warn!("Statement exceeded {}s, discarding connection", self.timeout.as_secs());
                drop(Object::take(client));
                return Err(self.timed_out());
            }
        };

        debug!(rows = result.row_count(), "Statement executed");
        Ok(result)
    }
}

fn row_to_map(row: &Row) -> Map<String, Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name().to_string(), column_value(row, i, col.type_())))
        .collect()
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> Option<T> {
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

/// Convert one column to JSON based on its Postgres type
fn column_value(row: &Row, idx: usize, ty: &Type) -> Value {
    if let Kind::Enum(_) = ty.kind() {
        return get::<EnumLabel>(row, idx)
            .map(|label| Value::String(label.0))
            .unwrap_or(Value::Null);
    }

    let value = match ty.name() {
        "bool" => get::<bool>(row, idx).map(Value::Bool),
        "int2" => get::<i16>(row, idx).map(Value::from),
        "int4" => get::<i32>(row, idx).map(Value::from),
        "int8" => get::<i64>(row, idx).map(Value::from),
        "oid" => get::<u32>(row, idx).map(Value::from),
        "float4" => get::<f32>(row, idx).map(|v| Value::from(f64::from(v))),
        "float8" => get::<f64>(row, idx).map(Value::from),
        "numeric" => get::<PgNumeric>(row, idx).map(|n| Value::String(n.0)),
        "json" | "jsonb" => get::<Value>(row, idx),
        "timestamp" => get::<chrono::NaiveDateTime>(row, idx)
            .map(|t| Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "timestamptz" => get::<chrono::DateTime<chrono::Utc>>(row, idx)
            .map(|t| Value::String(t.to_rfc3339())),
        "date" => get::<chrono::NaiveDate>(row, idx).map(|d| Value::String(d.to_string())),
        "time" => get::<chrono::NaiveTime>(row, idx).map(|t| Value::String(t.to_string())),
        "uuid" => get::<uuid::Uuid>(row, idx).map(|u| Value::String(u.to_string())),
        "bytea" => get::<Vec<u8>>(row, idx).map(|b| Value::String(to_hex(&b))),
        _ => get::<String>(row, idx).map(Value::String),
    };

    value.unwrap_or(Value::Null)
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Label of a user-defined enum value
struct EnumLabel(String);

impl<'a> FromSql<'a> for EnumLabel {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(EnumLabel(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
    }
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// NUMERIC rendered as exact decimal text
struct PgNumeric(String);

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let word = |i: usize| -> Result<u16, Box<dyn Error + Sync + Send>> {
            raw.get(i * 2..i * 2 + 2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .ok_or_else(|| "numeric value truncated".into())
        };

        let ndigits = word(0)? as usize;
        let weight = word(1)? as i16;
        let sign = word(2)?;
        let dscale = word(3)?;
        let digits = (0..ndigits)
            .map(|i| word(4 + i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PgNumeric(format_numeric(sign, weight, dscale, &digits)))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Digits are base 10000; `weight` is the power of the first digit
fn format_numeric(sign: u16, weight: i16, dscale: u16, digits: &[u16]) -> String {
    match sign {
        NUMERIC_NAN => return "NaN".to_string(),
        NUMERIC_PINF => return "Infinity".to_string(),
        NUMERIC_NINF => return "-Infinity".to_string(),
        _ => {}
    }

    let digit_at = |i: i32| -> u16 {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for i in 0..=i32::from(weight) {
            if i == 0 {
                out.push_str(&digit_at(i).to_string());
            } else {
                out.push_str(&format!("{:04}", digit_at(i)));
            }
        }
    }

    if dscale > 0 {
        let scale = usize::from(dscale);
        let mut frac = String::with_capacity(scale + 4);
        let mut i = i32::from(weight) + 1;
        while frac.len() < scale {
            frac.push_str(&format!("{:04}", digit_at(i)));
            i += 1;
        }
        frac.truncate(scale);
        out.push('.');
        out.push_str(&frac);
    }

    out
}
