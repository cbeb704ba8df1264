use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VisitorType {
    Individual,
    Family,
    Group,
}

// Discounts in basis points.
const PREBOOKED_DISCOUNT: i64 = 1_500;
const GROUP_DISCOUNT: i64 = 2_500;
const GROUP_PREPAID_DISCOUNT: i64 = 1_200;

/// Price of a prebooked visit in minor currency units.
pub fn quote(unit_price: i64, party_size: i32, visitor_type: VisitorType, paid: bool) -> i64 {
    let gross = unit_price * i64::from(party_size.max(0));
    match visitor_type {
        VisitorType::Individual | VisitorType::Family => discount(gross, PREBOOKED_DISCOUNT),
        VisitorType::Group => {
            let price = discount(gross, GROUP_DISCOUNT);
            if paid {
                discount(price, GROUP_PREPAID_DISCOUNT)
            } else {
                price
            }
        }
    }
}

// Rounds half up to the nearest minor unit.
fn discount(amount: i64, basis_points: i64) -> i64 {
    (amount * (10_000 - basis_points) + 5_000) / 10_000
}
