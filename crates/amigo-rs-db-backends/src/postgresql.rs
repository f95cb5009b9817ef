//! PostgreSQL driver using `tokio-postgres` and `deadpool-postgres`.
//!
//! The pool is capped at one connection and that connection is checked out
//! for the lifetime of the backend: `BEGIN`, the migration bodies, the ledger
//! writes and `COMMIT` must all travel over the same session.

use amigo_rs_core::{AmigoError, AmigoResult};
use amigo_rs_db::{DatabaseBackendType, DbExecutor, Row, Value};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{ToSql, Type};

type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// A PostgreSQL database backend.
pub struct PostgresBackend {
    client: deadpool_postgres::Object,
    _pool: deadpool_postgres::Pool,
}

impl PostgresBackend {
    /// Connects using a `postgres://` URL or a `key=value` connection string.
    ///
    /// # Errors
    ///
    /// Returns [`AmigoError::ImproperlyConfigured`] for an unparsable
    /// connection string and [`AmigoError::OperationalError`] when the server
    /// cannot be reached.
    pub async fn connect(url: &str) -> AmigoResult<Self> {
        let pg_config: tokio_postgres::Config = url.parse().map_err(|e| {
            AmigoError::ImproperlyConfigured(format!("Invalid PostgreSQL connection string: {e}"))
        })?;

        let manager = deadpool_postgres::Manager::new(pg_config, tokio_postgres::NoTls);
        let pool = deadpool_postgres::Pool::builder(manager)
            .max_size(1)
            .build()
            .map_err(|e| AmigoError::OperationalError(format!("Failed to create pool: {e}")))?;

        let client = pool
            .get()
            .await
            .map_err(|e| AmigoError::OperationalError(format!("Pool error: {e}")))?;

        Ok(Self {
            client,
            _pool: pool,
        })
    }

    /// Converts `Value`s to `tokio-postgres` parameters, guided by the types
    /// the server inferred for the prepared statement.
    ///
    /// `tokio-postgres` refuses to send an `i64` for an `int4` parameter, so
    /// integers are narrowed to the declared width.
    fn to_sql_params(params: &[Value], types: &[Type]) -> AmigoResult<Vec<BoxedParam>> {
        params
            .iter()
            .enumerate()
            .map(|(i, v)| Self::to_sql_param(v, types.get(i).unwrap_or(&Type::TEXT)))
            .collect()
    }

    fn to_sql_param(value: &Value, ty: &Type) -> AmigoResult<BoxedParam> {
        let param: BoxedParam = match *ty {
            Type::INT2 => Box::new(narrow::<i16>(value)?),
            Type::INT4 => Box::new(narrow::<i32>(value)?),
            Type::INT8 => Box::new(narrow::<i64>(value)?),
            Type::TIMESTAMPTZ => match value {
                Value::Timestamp(dt) => Box::new(dt.and_utc()),
                Value::Null => Box::new(Option::<chrono::DateTime<chrono::Utc>>::None),
                other => return Err(bind_error(other, ty)),
            },
            _ => match value {
                Value::Null => Box::new(Option::<String>::None),
                Value::Int(i) => Box::new(*i),
                Value::Text(s) => Box::new(s.clone()),
                Value::Timestamp(dt) => Box::new(*dt),
            },
        };
        Ok(param)
    }

    /// Converts a `tokio_postgres::Row` to our generic `Row`.
    fn convert_row(pg_row: &tokio_postgres::Row) -> AmigoResult<Row> {
        let columns: Vec<String> = pg_row
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let values = pg_row
            .columns()
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let value = match *col.type_() {
                    Type::INT2 => pg_row
                        .try_get::<_, Option<i16>>(i)?
                        .map_or(Value::Null, |v| Value::Int(i64::from(v))),
                    Type::INT4 => pg_row
                        .try_get::<_, Option<i32>>(i)?
                        .map_or(Value::Null, |v| Value::Int(i64::from(v))),
                    Type::INT8 => pg_row
                        .try_get::<_, Option<i64>>(i)?
                        .map_or(Value::Null, Value::Int),
                    Type::TIMESTAMP => pg_row
                        .try_get::<_, Option<chrono::NaiveDateTime>>(i)?
                        .map_or(Value::Null, Value::Timestamp),
                    Type::TIMESTAMPTZ => pg_row
                        .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(i)?
                        .map_or(Value::Null, |v| Value::Timestamp(v.naive_utc())),
                    _ => pg_row
                        .try_get::<_, Option<String>>(i)?
                        .map_or(Value::Null, Value::Text),
                };
                Ok(value)
            })
            .collect::<Result<Vec<Value>, tokio_postgres::Error>>()
            .map_err(|e| map_err(&e))?;

        Ok(Row::new(columns, values))
    }
}

fn narrow<T: TryFrom<i64>>(value: &Value) -> AmigoResult<Option<T>> {
    match value {
        Value::Null => Ok(None),
        Value::Int(i) => T::try_from(*i)
            .map(Some)
            .map_err(|_| AmigoError::DatabaseError(format!("Integer {i} out of range for column"))),
        other => Err(AmigoError::DatabaseError(format!(
            "Cannot bind {other:?} to an integer parameter"
        ))),
    }
}

fn bind_error(value: &Value, ty: &Type) -> AmigoError {
    AmigoError::DatabaseError(format!("Cannot bind {value:?} to a parameter of type {ty}"))
}

/// Maps a driver error, singling out unique violations.
fn map_err(e: &tokio_postgres::Error) -> AmigoError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        AmigoError::IntegrityError(e.to_string())
    } else if e.is_closed() {
        AmigoError::OperationalError(e.to_string())
    } else {
        AmigoError::DatabaseError(e.to_string())
    }
}

#[async_trait::async_trait]
impl DbExecutor for PostgresBackend {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::PostgreSQL
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> AmigoResult<u64> {
        if params.is_empty() {
            return self.client.execute(sql, &[]).await.map_err(|e| map_err(&e));
        }

        let stmt = self.client.prepare_cached(sql).await.map_err(|e| map_err(&e))?;
        let sql_params = Self::to_sql_params(params, stmt.params())?;
        let param_refs: Vec<&(dyn ToSql + Sync)> = sql_params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        self.client
            .execute(&stmt, &param_refs)
            .await
            .map_err(|e| map_err(&e))
    }

    async fn execute_batch(&self, sql: &str) -> AmigoResult<()> {
        self.client.batch_execute(sql).await.map_err(|e| map_err(&e))
    }

    async fn query(&self, sql: &str, params: &[Value]) -> AmigoResult<Vec<Row>> {
        let stmt = self.client.prepare_cached(sql).await.map_err(|e| map_err(&e))?;
        let sql_params = Self::to_sql_params(params, stmt.params())?;
        let param_refs: Vec<&(dyn ToSql + Sync)> = sql_params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = self
            .client
            .query(&stmt, &param_refs)
            .await
            .map_err(|e| map_err(&e))?;

        rows.iter().map(Self::convert_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_int4() {
        assert_eq!(narrow::<i32>(&Value::Int(7)).unwrap(), Some(7));
        assert_eq!(narrow::<i32>(&Value::Null).unwrap(), None);
        assert!(narrow::<i32>(&Value::Int(i64::MAX)).is_err());
        assert!(narrow::<i16>(&Value::Text("x".into())).is_err());
    }

    #[test]
    fn test_to_sql_params_follow_declared_types() {
        let params = PostgresBackend::to_sql_params(
            &[Value::from("a.sql"), Value::Int(3)],
            &[Type::VARCHAR, Type::INT4],
        )
        .unwrap();
        assert_eq!(params.len(), 2);

        let err = PostgresBackend::to_sql_params(&[Value::Int(1 << 40)], &[Type::INT4]);
        assert!(err.is_err());
    }

    #[test]
    fn test_to_sql_param_timestamptz_rejects_text() {
        assert!(PostgresBackend::to_sql_param(&Value::from("now"), &Type::TIMESTAMPTZ).is_err());
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_connection_string() {
        let err = PostgresBackend::connect("host=localhost port=notaport").await.err().unwrap();
        assert!(matches!(err, AmigoError::ImproperlyConfigured(_)));
    }
}
