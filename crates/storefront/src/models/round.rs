//! Round domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use rounds_core::{RoundId, RoundStatus, ShopId};

/// A time-boxed ordering window of one shop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: RoundId,
    pub shop_id: ShopId,
    pub name: String,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub shipping_date: Option<NaiveDate>,
    pub pickup_date: Option<NaiveDate>,
    pub status: RoundStatus,
    pub created_at: DateTime<Utc>,
}

impl Round {
    /// Whether the round takes orders at `now`: it is `OPEN` and `now` falls
    /// inside the window. A missing bound leaves that side open.
    #[must_use]
    pub fn accepts_orders_at(&self, now: DateTime<Utc>) -> bool {
        self.status == RoundStatus::Open
            && self.opens_at.is_none_or(|opens| now >= opens)
            && self.closes_at.is_none_or(|closes| now < closes)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn round(opens: Option<i64>, closes: Option<i64>, status: RoundStatus) -> Round {
        let now = Utc::now();
        Round {
            id: RoundId::new(1),
            shop_id: ShopId::new(1),
            name: "March".into(),
            opens_at: opens.map(|h| now + Duration::hours(h)),
            closes_at: closes.map(|h| now + Duration::hours(h)),
            shipping_date: None,
            pickup_date: None,
            status,
            created_at: now,
        }
    }

    #[test]
    fn test_window() {
        let now = Utc::now();
        assert!(round(None, None, RoundStatus::Open).accepts_orders_at(now));
        assert!(round(Some(-1), Some(1), RoundStatus::Open).accepts_orders_at(now));
        assert!(!round(Some(1), None, RoundStatus::Open).accepts_orders_at(now));
        assert!(!round(None, Some(-1), RoundStatus::Open).accepts_orders_at(now));
    }

    #[test]
    fn test_closed_round_never_accepts() {
        assert!(!round(None, None, RoundStatus::Closed).accepts_orders_at(Utc::now()));
    }
}
