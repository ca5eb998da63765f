use axum::http::{HeaderMap, header};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{instrument, warn};

use campus_core::AppError;
use campus_models::ids::UserId;

use super::model::{AuditAction, AuditLog, AuditLogFilterParams, PaginatedAuditLogsResponse};

/// Caller details stored alongside an audit entry.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Takes the first `X-Forwarded-For` hop, falling back to `X-Real-IP`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let ip_address = header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
            .or_else(|| header_str("x-real-ip"));

        Self {
            ip_address,
            user_agent: header_str(header::USER_AGENT.as_str()),
        }
    }
}

pub struct AuditService;

impl AuditService {
    /// Writes one audit entry. A failed insert is logged and never fails the caller.
    #[instrument(skip(db, details))]
    pub async fn record(
        db: &PgPool,
        user_id: Option<UserId>,
        action: AuditAction,
        table_name: &str,
        object_id: Option<String>,
        details: Value,
        client: &ClientInfo,
    ) {
        let result = sqlx::query(
            r#"INSERT INTO audit_logs (user_id, action, table_name, object_id, details, ip_address, user_agent)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(user_id)
        .bind(action)
        .bind(table_name)
        .bind(&object_id)
        .bind(&details)
        .bind(&client.ip_address)
        .bind(&client.user_agent)
        .execute(db)
        .await;

        if let Err(e) = result {
            warn!(error = %e, table_name, action = %action, "Failed to write audit entry");
        }
    }

    #[instrument(skip(db))]
    pub async fn get_audit_logs(
        db: &PgPool,
        filters: AuditLogFilterParams,
    ) -> Result<PaginatedAuditLogsResponse, AppError> {
        let mut where_clause = String::from(" WHERE 1=1");
        let mut idx = 0;

        if filters.user_id.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND user_id = ${}", idx));
        }
        if filters.action.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND action = ${}", idx));
        }
        if filters.table_name.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND table_name = ${}", idx));
        }

        let count_sql = format!("SELECT COUNT(*) FROM audit_logs{}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(user_id) = filters.user_id {
            count_query = count_query.bind(user_id);
        }
        if let Some(action) = filters.action {
            count_query = count_query.bind(action);
        }
        if let Some(table_name) = &filters.table_name {
            count_query = count_query.bind(table_name);
        }
        let total = count_query.fetch_one(db).await?;

        let data_sql = format!(
            r#"SELECT id, user_id, action, table_name, object_id, details, ip_address, user_agent, created_at
               FROM audit_logs{} ORDER BY created_at DESC{}"#,
            where_clause,
            filters.pagination.sql_suffix()
        );
        let mut data_query = sqlx::query_as::<_, AuditLog>(&data_sql);
        if let Some(user_id) = filters.user_id {
            data_query = data_query.bind(user_id);
        }
        if let Some(action) = filters.action {
            data_query = data_query.bind(action);
        }
        if let Some(table_name) = &filters.table_name {
            data_query = data_query.bind(table_name);
        }
        let data = data_query.fetch_all(db).await?;

        Ok(PaginatedAuditLogsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_info_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.0.0.7, 172.16.0.1".parse().unwrap());
        headers.insert("x-real-ip", "192.168.1.1".parse().unwrap());
        headers.insert(header::USER_AGENT, "campus-tests/1.0".parse().unwrap());

        let info = ClientInfo::from_headers(&headers);
        assert_eq!(info.ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(info.user_agent.as_deref(), Some("campus-tests/1.0"));
    }

    #[test]
    fn client_info_without_headers_is_empty() {
        let info = ClientInfo::from_headers(&HeaderMap::new());
        assert!(info.ip_address.is_none());
        assert!(info.user_agent.is_none());
    }
}
