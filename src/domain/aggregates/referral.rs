//! Referral program

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::voucher::{Voucher, VoucherScope, VoucherValue};
use crate::domain::events::{DomainEvent, ReferralEvent};
use crate::domain::value_objects::{Code, Money};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referee_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Referral {
    pub fn record(referrer_id: Uuid, referee_id: Uuid) -> Result<Self, ReferralError> {
        if referrer_id == referee_id { return Err(ReferralError::SelfReferral); }
        Ok(Self { id: Uuid::now_v7(), referrer_id, referee_id, created_at: Utc::now() })
    }

    pub fn event(&self) -> DomainEvent {
        DomainEvent::Referral(ReferralEvent::Used { referrer_id: self.referrer_id, referee_id: self.referee_id })
    }
}

/// Rewards a referrer every `threshold` successful referrals.
#[derive(Clone, Debug)]
pub struct ReferralPolicy {
    pub threshold: u32,
    pub reward_amount: Money,
    pub reward_validity: Duration,
}

impl ReferralPolicy {
    pub fn earns_reward(&self, referral_count: u32) -> bool {
        self.threshold > 0 && referral_count > 0 && referral_count % self.threshold == 0
    }

    /// Personal single-use voucher once `referral_count` hits a multiple of the threshold.
    pub fn reward_for(&self, referrer_id: Uuid, referral_count: u32, now: DateTime<Utc>) -> Result<Option<Voucher>, ReferralError> {
        if !self.earns_reward(referral_count) { return Ok(None); }
        let mut voucher = Voucher::issue(
            Code::generate("REF"),
            VoucherScope::Total,
            VoucherValue::Nominal { amount: self.reward_amount },
            now,
            now + self.reward_validity,
        )
        .map_err(|e| ReferralError::Reward(e.to_string()))?;
        voucher.owner_id = Some(referrer_id);
        voucher.usage_limit = Some(1);
        Ok(Some(voucher))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReferralError {
    #[error("cannot use your own referral code")]
    SelfReferral,
    #[error("unknown referral code")]
    UnknownCode,
    #[error("account was already referred")]
    AlreadyReferred,
    #[error("could not issue reward: {0}")]
    Reward(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReferralPolicy {
        ReferralPolicy { threshold: 3, reward_amount: Money::rupiah(20_000), reward_validity: Duration::days(30) }
    }

    #[test]
    fn test_reward_every_threshold() {
        let p = policy();
        let referrer = Uuid::new_v4();
        let now = Utc::now();
        assert!(p.reward_for(referrer, 2, now).unwrap().is_none());
        let v = p.reward_for(referrer, 3, now).unwrap().unwrap();
        assert_eq!(v.owner_id, Some(referrer));
        assert_eq!(v.usage_limit, Some(1));
        assert_eq!(v.expires_at, now + Duration::days(30));
        assert!(v.code.as_str().starts_with("REF-"));
        assert!(p.reward_for(referrer, 4, now).unwrap().is_none());
        assert!(p.reward_for(referrer, 6, now).unwrap().is_some());
    }

    #[test]
    fn test_self_referral_rejected() {
        let id = Uuid::new_v4();
        assert_eq!(Referral::record(id, id).unwrap_err(), ReferralError::SelfReferral);
    }

    #[test]
    fn test_zero_threshold_never_rewards() {
        let p = ReferralPolicy { threshold: 0, ..policy() };
        assert!(!p.earns_reward(3));
    }
}
