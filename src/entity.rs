//! Transitionable entities and their state vocabularies.
//!
//! Every entity here is owned by the store; the engine never holds one across
//! requests. State is re-read inside the committing transaction before any
//! guard runs.

use chrono::{DateTime, TimeZone, Utc};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn now() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

// Order lifecycle. COMPLETED and CANCELLED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum OrderStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    AwaitingPayment,
    #[n(2)]
    Paid,
    #[n(3)]
    Shipped,
    #[n(4)]
    DisputeOpen,
    #[n(5)]
    Completed,
    #[n(6)]
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::AwaitingPayment => "AWAITING_PAYMENT",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::DisputeOpen => "DISPUTE_OPEN",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum RefundStatus {
    #[n(0)]
    None,
    #[n(1)]
    Full,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::None => "none",
            RefundStatus::Full => "full",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Order {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub status: OrderStatus,
    #[n(2)]
    pub refund: RefundStatus,
}

// Dispute lifecycle. Both verdict states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum DisputeStatus {
    #[n(0)]
    Open,
    #[n(1)]
    RefundedBuyer,
    #[n(2)]
    ReleasedSeller,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::Open => "open",
            DisputeStatus::RefundedBuyer => "refunded_buyer",
            DisputeStatus::ReleasedSeller => "released_seller",
        }
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Dispute {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub order_id: String,
    #[n(2)]
    pub status: DisputeStatus,
    #[n(3)]
    pub admin_verdict: Option<String>,
    #[n(4)]
    pub resolved_at: Option<TimeStamp<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum PayoutStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Processed,
    #[n(2)]
    Rejected,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Processed => "processed",
            PayoutStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Payout {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub status: PayoutStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum AppealStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

impl AppealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppealStatus::Pending => "pending",
            AppealStatus::Approved => "approved",
            AppealStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for AppealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suspension appeal. Legacy rows have no recorded status and read as pending.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Appeal {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub user_id: String,
    #[n(2)]
    pub status: Option<AppealStatus>,
    #[n(3)]
    pub admin_notes: Option<String>,
    #[n(4)]
    pub updated_at: Option<TimeStamp<Utc>>,
}

impl Appeal {
    pub fn current_status(&self) -> AppealStatus {
        self.status.unwrap_or(AppealStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum AccountStatus {
    #[n(0)]
    Active,
    #[n(1)]
    Suspended,
    #[n(2)]
    Banned,
    #[n(3)]
    PendingAppeal,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Banned => "banned",
            AccountStatus::PendingAppeal => "pending_appeal",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum VerificationStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Verified,
    #[n(2)]
    Rejected,
}

/// A marketplace user profile, as far as admin actions touch it.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Profile {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub account_status: AccountStatus,
    #[n(2)]
    pub is_verified: bool,
    #[n(3)]
    pub verification_status: VerificationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum VerificationRequestStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

impl VerificationRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationRequestStatus::Pending => "pending",
            VerificationRequestStatus::Approved => "approved",
            VerificationRequestStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for VerificationRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct VerificationRequest {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub profile_id: String,
    #[n(2)]
    pub status: VerificationRequestStatus,
}

/// Singleton platform settings, super_admin only.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct AppSettings {
    #[n(0)]
    pub maintenance_mode: bool,
    #[n(1)]
    pub min_version_ios: String,
    #[n(2)]
    pub min_version_android: String,
    #[n(3)]
    pub support_phone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::now();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn appeal_without_status_reads_pending() {
        let appeal = Appeal {
            id: "appeal_1".into(),
            user_id: "user_1".into(),
            status: None,
            admin_notes: None,
            updated_at: None,
        };

        assert_eq!(appeal.current_status(), AppealStatus::Pending);
    }

    #[test]
    fn order_encoding() {
        let original = Order {
            id: "order_1q".into(),
            status: OrderStatus::DisputeOpen,
            refund: RefundStatus::None,
        };

        let encoding = minicbor::to_vec(&original).unwrap();
        let decoded: Order = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decoded);
    }
}
