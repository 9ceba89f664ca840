use crate::db_types::{CallRecord, CallRow, CustomerInfo, CustomerRow};

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} record not found for call_id {call_id}")]
    NotFound { kind: &'static str, call_id: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed stored data: {0}")]
    Malformed(String),
}

/// The three record operations a transfer needs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_call(&self, call_id: &str) -> Result<CallRecord, StoreError>;
    async fn get_customer_info(&self, call_id: &str) -> Result<CustomerInfo, StoreError>;
    /// Write the whole record, replacing what is stored.
    async fn update_call(&self, call: &CallRecord) -> Result<(), StoreError>;
}

pub struct PgRecordStore {
    pool: Pool<Postgres>,
}

impl PgRecordStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get_call(&self, call_id: &str) -> Result<CallRecord, StoreError> {
        let row = sqlx::query_as::<_, CallRow>(
            "SELECT call_id, vicidial_id, phone_number, qualification_status, transfer_status, \
             transfer_details, call_state, last_update, end_timestamp \
             FROM calls WHERE call_id = $1",
        )
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(call_id, error = %e, "error retrieving call data");
            StoreError::from(e)
        })?;
        let row = row.ok_or_else(|| StoreError::NotFound {
            kind: "call",
            call_id: call_id.to_string(),
        })?;
        CallRecord::try_from(row).map_err(StoreError::Malformed)
    }

    async fn get_customer_info(&self, call_id: &str) -> Result<CustomerInfo, StoreError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT call_id, first_name, last_name, debt_info FROM customer_info WHERE call_id = $1",
        )
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(call_id, error = %e, "error retrieving customer info");
            StoreError::from(e)
        })?;
        row.map(CustomerInfo::from)
            .ok_or_else(|| StoreError::NotFound {
                kind: "customer info",
                call_id: call_id.to_string(),
            })
    }

    async fn update_call(&self, call: &CallRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO calls (call_id, vicidial_id, phone_number, qualification_status, \
             transfer_status, transfer_details, call_state, last_update, end_timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (call_id) DO UPDATE SET \
             vicidial_id = EXCLUDED.vicidial_id, \
             phone_number = EXCLUDED.phone_number, \
             qualification_status = EXCLUDED.qualification_status, \
             transfer_status = EXCLUDED.transfer_status, \
             transfer_details = EXCLUDED.transfer_details, \
             call_state = EXCLUDED.call_state, \
             last_update = EXCLUDED.last_update, \
             end_timestamp = EXCLUDED.end_timestamp",
        )
        .bind(&call.call_id)
        .bind(&call.vicidial_id)
        .bind(&call.phone_number)
        .bind(&call.qualification_status)
        .bind(call.transfer_status.as_str())
        .bind(&call.transfer_details)
        .bind(call.call_state.as_str())
        .bind(call.last_update)
        .bind(call.end_timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(call_id = %call.call_id, error = %e, "error updating call data");
            StoreError::from(e)
        })?;
        debug!(call_id = %call.call_id, "call record written");
        Ok(())
    }
}

/// In-process store. Counts every read and write so callers can see what an invocation touched.
#[derive(Default)]
pub struct MemoryStore {
    calls: Mutex<HashMap<String, CallRecord>>,
    customers: Mutex<HashMap<String, CustomerInfo>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `update_call` always fails.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn insert_call(&self, call: CallRecord) {
        let mut calls = self.calls.lock().unwrap();
        calls.insert(call.call_id.clone(), call);
    }

    pub fn insert_customer(&self, customer: CustomerInfo) {
        let mut customers = self.customers.lock().unwrap();
        customers.insert(customer.call_id.clone(), customer);
    }

    /// Stored copy of a call, bypassing the counters.
    pub fn call(&self, call_id: &str) -> Option<CallRecord> {
        self.calls.lock().unwrap().get(call_id).cloned()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_call(&self, call_id: &str) -> Result<CallRecord, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.call(call_id).ok_or_else(|| StoreError::NotFound {
            kind: "call",
            call_id: call_id.to_string(),
        })
    }

    async fn get_customer_info(&self, call_id: &str) -> Result<CustomerInfo, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let customers = self.customers.lock().unwrap();
        customers
            .get(call_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "customer info",
                call_id: call_id.to_string(),
            })
    }

    async fn update_call(&self, call: &CallRecord) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.insert_call(call.clone());
        Ok(())
    }
}
