use crate::error::{AppError, AppResult};
use crate::models::Requester;
use crate::repositories::UserStore;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `message` under `secret`
pub fn hmac_hex(secret: &str, message: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(format!("Invalid HMAC key: {}", e)))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison
pub fn constant_time_eq(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).unwrap_u8() == 1
}

/// Signature the provider hands the client after checkout: `HMAC(order_id|payment_id)`
pub fn payment_signature(secret: &str, order_id: &str, payment_id: &str) -> AppResult<String> {
    let message = format!("{}|{}", order_id, payment_id);
    hmac_hex(secret, message.as_bytes())
}

/// Verify a client-submitted checkout signature
///
/// # Returns
/// * `Ok(())` if the signature matches
/// * `Err(AppError::InvalidSignature)` otherwise
pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> AppResult<()> {
    if order_id.is_empty() || payment_id.is_empty() || signature.is_empty() {
        return Err(AppError::InvalidSignature(
            "orderId, paymentId and signature are required".to_string(),
        ));
    }

    let expected = payment_signature(secret, order_id, payment_id)?;
    if !constant_time_eq(&expected, signature.trim()) {
        return Err(AppError::InvalidSignature(
            "Invalid payment signature".to_string(),
        ));
    }

    Ok(())
}

/// Verify a webhook delivery against the exact bytes received.
///
/// The body must not be re-serialised before this check or the digest will
/// never match.
pub fn verify_webhook_signature(secret: &str, raw_body: &[u8], header: &str) -> AppResult<()> {
    let provided = header.trim();
    if provided.is_empty() {
        return Err(AppError::InvalidSignature(
            "Missing webhook signature".to_string(),
        ));
    }

    let expected = hmac_hex(secret, raw_body)?;
    if !constant_time_eq(&expected, provided) {
        return Err(AppError::InvalidSignature(
            "Invalid webhook signature".to_string(),
        ));
    }

    Ok(())
}

/// Resolve the caller from the user id forwarded by the authenticating gateway
///
/// Token issuance and validation happen upstream; this only maps the
/// already-authenticated id to a role.
pub async fn resolve_requester(users: &dyn UserStore, user_id: &str) -> AppResult<Requester> {
    let raw = user_id.trim();
    if raw.is_empty() {
        return Err(AppError::Unauthorized("Not authenticated".to_string()));
    }

    let id = Uuid::parse_str(raw)
        .map_err(|_| AppError::Unauthorized("Invalid user id".to_string()))?;

    let user = users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;

    Ok(Requester::from(&user))
}
