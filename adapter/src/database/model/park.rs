use kernel::model::{id::ParkId, park::Park};

#[derive(sqlx::FromRow)]
pub struct ParkRow {
    pub park_id: ParkId,
    pub park_name: String,
    pub max_capacity: i32,
    pub reserved_capacity: i32,
    pub estimated_stay_hours: i32,
    pub current_visitors: i32,
    pub unit_price: i64,
}

impl From<ParkRow> for Park {
    fn from(value: ParkRow) -> Self {
        let ParkRow {
            park_id,
            park_name,
            max_capacity,
            reserved_capacity,
            estimated_stay_hours,
            current_visitors,
            unit_price,
        } = value;
        Park {
            park_id,
            park_name,
            max_capacity,
            reserved_capacity,
            estimated_stay_hours,
            current_visitors,
            unit_price,
        }
    }
}
