//! Sale line items.
//!
//! `taken_quantity` tracks how much of the ordered quantity has physically
//! left inventory. For ordinary sales it equals `quantity` from the start;
//! for deferred orders it starts at zero and only grows as goods are
//! collected. Invariant: `0 <= taken_quantity <= quantity`.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::parse_uuid;
use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub taken_quantity: i64,
    /// Unit price charged at time of sale.
    pub unit_price_minor: i64,
    /// Unit cost at time of sale, for margin reporting.
    pub unit_cost_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sale_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub taken_quantity: i64,
    pub unit_price_minor: i64,
    pub unit_cost_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales::Entity",
        from = "Column::SaleId",
        to = "super::sales::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Sales,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Products,
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SaleItem> for ActiveModel {
    fn from(item: &SaleItem) -> Self {
        Self {
            id: ActiveValue::Set(item.id.to_string()),
            sale_id: ActiveValue::Set(item.sale_id.to_string()),
            product_id: ActiveValue::Set(item.product_id.to_string()),
            quantity: ActiveValue::Set(item.quantity),
            taken_quantity: ActiveValue::Set(item.taken_quantity),
            unit_price_minor: ActiveValue::Set(item.unit_price_minor),
            unit_cost_minor: ActiveValue::Set(item.unit_cost_minor),
        }
    }
}

impl TryFrom<Model> for SaleItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "sale item")?,
            sale_id: parse_uuid(&model.sale_id, "sale")?,
            product_id: parse_uuid(&model.product_id, "product")?,
            quantity: model.quantity,
            taken_quantity: model.taken_quantity,
            unit_price_minor: model.unit_price_minor,
            unit_cost_minor: model.unit_cost_minor,
        })
    }
}
