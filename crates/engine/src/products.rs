//! Products with stock on hand.
//!
//! Stock moves when goods physically leave or re-enter the store: at sale
//! time for ordinary sales, at collection time for deferred orders, and
//! back in when a sale is cancelled.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::parse_uuid;
use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub unit_price_minor: i64,
    pub unit_cost_minor: i64,
    pub stock_quantity: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub unit_price_minor: i64,
    pub unit_cost_minor: i64,
    pub stock_quantity: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_items::Entity")]
    SaleItems,
}

impl Related<super::sale_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Product> for ActiveModel {
    fn from(product: &Product) -> Self {
        Self {
            id: ActiveValue::Set(product.id.to_string()),
            name: ActiveValue::Set(product.name.clone()),
            unit_price_minor: ActiveValue::Set(product.unit_price_minor),
            unit_cost_minor: ActiveValue::Set(product.unit_cost_minor),
            stock_quantity: ActiveValue::Set(product.stock_quantity),
        }
    }
}

impl TryFrom<Model> for Product {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "product")?,
            name: model.name,
            unit_price_minor: model.unit_price_minor,
            unit_cost_minor: model.unit_cost_minor,
            stock_quantity: model.stock_quantity,
        })
    }
}
