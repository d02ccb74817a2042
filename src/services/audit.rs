use crate::error::{AppError, AppResult};
use crate::models::{Booking, Requester};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: i64,
    pub event_type: String, // "booking_committed", "booking_cancelled", "amount_mismatch", ...
    pub booking_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub payment_reference: Option<String>,
    pub details: serde_json::Value,
}

enum AuditSink {
    File(Arc<Mutex<std::fs::File>>),
    Memory(Arc<Mutex<Vec<AuditLogEntry>>>),
}

/// Append-only trail of booking commits, cancellations and dropped webhook
/// deliveries.
///
/// Written as JSON lines to `audit_YYYY-MM-DD.log`; the in-memory sink keeps
/// entries for inspection instead.
pub struct AuditTrailService {
    sink: AuditSink,
}

impl AuditTrailService {
    /// Create a new audit trail service
    pub fn new(log_directory: PathBuf) -> AppResult<Self> {
        // Ensure directory exists
        std::fs::create_dir_all(&log_directory)
            .map_err(|e| AppError::Message(format!("Failed to create log directory: {}", e)))?;

        let date = chrono::Utc::now().format("%Y-%m-%d");
        let log_file = log_directory.join(format!("audit_{}.log", date));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| AppError::Message(format!("Failed to open audit log file: {}", e)))?;

        info!("Audit trail initialized: {:?}", log_file);

        Ok(Self {
            sink: AuditSink::File(Arc::new(Mutex::new(file))),
        })
    }

    /// Audit trail that keeps entries in memory
    pub fn in_memory() -> Self {
        Self {
            sink: AuditSink::Memory(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Entries recorded so far (in-memory sink only)
    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        match &self.sink {
            AuditSink::Memory(entries) => entries.lock().await.clone(),
            AuditSink::File(_) => Vec::new(),
        }
    }

    /// Log an audit entry
    pub async fn log(&self, entry: AuditLogEntry) -> AppResult<()> {
        match &self.sink {
            AuditSink::File(handle) => {
                let json = serde_json::to_string(&entry)?;

                let mut file = handle.lock().await;
                writeln!(file, "{}", json)
                    .map_err(|e| AppError::Message(format!("Failed to write audit log: {}", e)))?;
                file.flush()
                    .map_err(|e| AppError::Message(format!("Failed to flush audit log: {}", e)))?;
            }
            AuditSink::Memory(entries) => entries.lock().await.push(entry),
        }

        Ok(())
    }

    /// Log a booking created from a confirmed payment
    pub async fn log_booking_committed(&self, booking: &Booking, source: &str) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "booking_committed".to_string(),
            booking_id: Some(booking.id),
            listing_id: Some(booking.listing_id),
            payment_reference: booking.payment_reference.clone(),
            details: serde_json::json!({
                "source": source,
                "user_id": booking.user_id.to_string(),
                "start_date": booking.start_date.to_rfc3339(),
                "end_date": booking.end_date.to_rfc3339(),
                "guests": booking.guests,
                "total_price": booking.total_price,
            }),
        };

        self.log(entry).await
    }

    /// Log a cancellation and who performed it
    pub async fn log_booking_cancelled(
        &self,
        booking: &Booking,
        requester: &Requester,
    ) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "booking_cancelled".to_string(),
            booking_id: Some(booking.id),
            listing_id: Some(booking.listing_id),
            payment_reference: booking.payment_reference.clone(),
            details: serde_json::json!({
                "cancelled_by": requester.user_id.to_string(),
                "role": requester.role.as_str(),
            }),
        };

        self.log(entry).await
    }

    /// Log a payment whose collected amount differs from the booking it settled into
    pub async fn log_amount_mismatch(
        &self,
        booking: &Booking,
        collected: i64,
        recorded: i64,
    ) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "amount_mismatch".to_string(),
            booking_id: Some(booking.id),
            listing_id: Some(booking.listing_id),
            payment_reference: booking.payment_reference.clone(),
            details: serde_json::json!({
                "collected": collected,
                "recorded": recorded,
            }),
        };

        self.log(entry).await
    }

    /// Log a webhook delivery that was acknowledged but produced no booking
    pub async fn log_reconciliation_skipped(
        &self,
        payment_reference: Option<&str>,
        listing_id: Option<Uuid>,
        reason: &str,
        details: serde_json::Value,
    ) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "reconciliation_skipped".to_string(),
            booking_id: None,
            listing_id,
            payment_reference: payment_reference.map(str::to_string),
            details: serde_json::json!({
                "reason": reason,
                "context": details,
            }),
        };

        self.log(entry).await
    }
}
