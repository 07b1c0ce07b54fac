use std::ops::{BitOr, BitOrAssign};

use serde::Serialize;
use time::OffsetDateTime;

use super::receipt::InApp;

/// Lifecycle state of an auto-renewable subscription record. Each state
/// owns one bit so several can be combined into a [`StateMask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SubscriptionState {
    Active = 1 << 0,
    /// Valid, but in a free trial or introductory price period
    Free = 1 << 1,
    Expired = 1 << 2,
    Canceled = 1 << 3,
}

impl SubscriptionState {
    pub const ALL: [SubscriptionState; 4] = [
        SubscriptionState::Active,
        SubscriptionState::Free,
        SubscriptionState::Expired,
        SubscriptionState::Canceled,
    ];

    pub fn bit(self) -> u8 {
        self as u8
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "free" => Some(Self::Free),
            "expired" => Some(Self::Expired),
            "canceled" | "cancelled" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Free => "free",
            Self::Expired => "expired",
            Self::Canceled => "canceled",
        }
    }
}

/// Set of [`SubscriptionState`]s. The empty mask disables filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StateMask(u8);

impl StateMask {
    pub const EMPTY: StateMask = StateMask(0);

    /// Active or Free: records that currently grant access.
    pub fn entitled() -> Self {
        SubscriptionState::Active | SubscriptionState::Free
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, state: SubscriptionState) -> bool {
        self.0 & state.bit() != 0
    }

    /// Whether a record in `state` passes this filter.
    pub fn admits(&self, state: SubscriptionState) -> bool {
        self.is_empty() || self.contains(state)
    }
}

impl From<SubscriptionState> for StateMask {
    fn from(state: SubscriptionState) -> Self {
        StateMask(state.bit())
    }
}

impl FromIterator<SubscriptionState> for StateMask {
    fn from_iter<I: IntoIterator<Item = SubscriptionState>>(iter: I) -> Self {
        iter.into_iter().fold(StateMask::EMPTY, |mask, state| mask | state)
    }
}

impl BitOr for SubscriptionState {
    type Output = StateMask;

    fn bitor(self, rhs: SubscriptionState) -> StateMask {
        StateMask(self.bit() | rhs.bit())
    }
}

impl BitOr<SubscriptionState> for StateMask {
    type Output = StateMask;

    fn bitor(self, rhs: SubscriptionState) -> StateMask {
        StateMask(self.0 | rhs.bit())
    }
}

impl BitOr for StateMask {
    type Output = StateMask;

    fn bitor(self, rhs: StateMask) -> StateMask {
        StateMask(self.0 | rhs.0)
    }
}

impl BitOrAssign<SubscriptionState> for StateMask {
    fn bitor_assign(&mut self, rhs: SubscriptionState) {
        self.0 |= rhs.bit();
    }
}

/// A transaction together with the state derived for it at verification
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoRenewable {
    #[serde(flatten)]
    pub in_app: InApp,
    pub state: SubscriptionState,
}

impl AutoRenewable {
    pub fn new(in_app: InApp, now: OffsetDateTime) -> Self {
        let state = classify(&in_app, now);
        Self { in_app, state }
    }
}

/// Derives the state of a record as of `now`.
///
/// Order is fixed: a cancellation beats everything, then expiration,
/// then the trial/intro flags.
pub fn classify(in_app: &InApp, now: OffsetDateTime) -> SubscriptionState {
    if !in_app.cancellation_date.is_zero() {
        SubscriptionState::Canceled
    } else if in_app.subscription_expiration_date.is_before(now) {
        // expiration_intent is unreliable here, only the date counts
        SubscriptionState::Expired
    } else if in_app.subscription_trial_period || in_app.subscription_introductory_price_period {
        SubscriptionState::Free
    } else {
        SubscriptionState::Active
    }
}

pub fn classify_now(in_app: &InApp) -> SubscriptionState {
    classify(in_app, OffsetDateTime::now_utc())
}

/// Classifies every record, keeping server order and duplicates of the
/// same original transaction.
pub fn extract_auto_renewables(
    in_apps: Vec<InApp>,
    mask: StateMask,
    now: OffsetDateTime,
) -> Vec<AutoRenewable> {
    in_apps
        .into_iter()
        .map(|in_app| AutoRenewable::new(in_app, now))
        .filter(|sub| mask.admits(sub.state))
        .collect()
}
