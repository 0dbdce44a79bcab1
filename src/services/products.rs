use crate::{
    db::DbPool,
    entities::{
        customer, order, plan_change_log, product, product_config, product_plan, product_price,
        sale, sales_record, stock_item,
    },
    errors::ServiceError,
    services::uploads::{UploadStore, PRODUCT_IMAGE_EXTENSIONS},
};
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

pub const PRODUCT_IMAGE_AREA: &str = "product_images";
pub const PRODUCT_TYPES: [&str; 7] = [
    "Garment", "Knitted", "Woven", "Yarn", "Dyed", "Printed", "Denim",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Select,
    Checkbox,
}

/// One entry of a product type's parameter form
#[derive(Debug, Clone, Serialize)]
pub struct ParamField {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
}

const fn text(name: &'static str, label: &'static str) -> (&'static str, &'static str, FieldKind) {
    (name, label, FieldKind::Text)
}

const fn number(name: &'static str, label: &'static str) -> (&'static str, &'static str, FieldKind) {
    (name, label, FieldKind::Number)
}

const FABRIC_TYPE: (&str, &str, FieldKind) = text("fabric_type", "Fabric Type");
const FABRIC_GSM: (&str, &str, FieldKind) = number("fabric_gsm", "Fabric GSM");
const FABRIC_WIDTH: (&str, &str, FieldKind) = number("fabric_width", "Fabric Width");
const YARN_COUNT: (&str, &str, FieldKind) = text("yarn_count", "Yarn Count");
const WEAVE_TYPE: (&str, &str, FieldKind) = text("weave_type", "Weave Type");
const COLORS: (&str, &str, FieldKind) = text("colors", "Colors (comma-separated)");
const PACKAGING: (&str, &str, FieldKind) = text("packaging_method", "Packaging Method");
const PRINT_TYPE: (&str, &str, FieldKind) = text("print_type", "Print Type");

pub const TARGET_GROUPS: [&str; 4] = ["Men", "Women", "Kids", "Newborn"];

/// Sizes offered for each garment target group
pub fn size_range(target_group: &str) -> &'static [&'static str] {
    match target_group {
        "Men" => &["S", "M", "L", "XL", "XXL"],
        "Women" => &["XS", "S", "M", "L", "XL"],
        "Kids" => &["2T", "3T", "4T", "5-6", "7-8"],
        "Newborn" => &["0-3M", "3-6M", "6-9M", "9-12M"],
        _ => &[],
    }
}

static TEMPLATES: Lazy<BTreeMap<&'static str, Vec<ParamField>>> = Lazy::new(|| {
    let build = |fields: &[(&'static str, &'static str, FieldKind)]| {
        fields
            .iter()
            .map(|&(name, label, kind)| ParamField {
                name,
                label,
                kind,
                options: Vec::new(),
            })
            .collect::<Vec<_>>()
    };

    let mut garment = build(&[
        text("garment_type", "Garment Type"),
        FABRIC_TYPE,
        FABRIC_GSM,
        text("fabric_composition", "Fabric Composition"),
    ]);
    garment.push(ParamField {
        name: "target_group",
        label: "Target Group",
        kind: FieldKind::Select,
        options: TARGET_GROUPS.to_vec(),
    });
    garment.push(ParamField {
        name: "size_range",
        label: "Size Range",
        kind: FieldKind::Checkbox,
        options: Vec::new(),
    });
    garment.extend(build(&[
        COLORS,
        PRINT_TYPE,
        text("embroidery", "Embroidery"),
        PACKAGING,
    ]));

    let mut templates = BTreeMap::new();
    templates.insert("Garment", garment);
    templates.insert(
        "Knitted",
        build(&[
            FABRIC_TYPE,
            FABRIC_GSM,
            FABRIC_WIDTH,
            text("gauge", "Gauge"),
            YARN_COUNT,
            COLORS,
            PACKAGING,
        ]),
    );
    templates.insert(
        "Woven",
        build(&[
            FABRIC_TYPE,
            FABRIC_GSM,
            FABRIC_WIDTH,
            YARN_COUNT,
            WEAVE_TYPE,
            COLORS,
            PACKAGING,
        ]),
    );
    templates.insert(
        "Yarn",
        build(&[
            text("yarn_type", "Yarn Type"),
            YARN_COUNT,
            text("yarn_composition", "Yarn Composition"),
            number("twist_per_inch", "Twist per Inch (TPI)"),
            COLORS,
            text("yarn_packaging", "Yarn Packaging"),
        ]),
    );
    templates.insert(
        "Dyed",
        build(&[
            FABRIC_TYPE,
            FABRIC_GSM,
            FABRIC_WIDTH,
            COLORS,
            text("dyeing_method", "Dyeing Method"),
            PACKAGING,
        ]),
    );
    templates.insert(
        "Printed",
        build(&[
            FABRIC_TYPE,
            FABRIC_GSM,
            FABRIC_WIDTH,
            text("print_design", "Print Design"),
            PRINT_TYPE,
            COLORS,
            PACKAGING,
        ]),
    );
    templates.insert(
        "Denim",
        build(&[
            FABRIC_TYPE,
            FABRIC_GSM,
            FABRIC_WIDTH,
            YARN_COUNT,
            WEAVE_TYPE,
            text("indigo_dye_level", "Indigo Dye Level"),
            COLORS,
            PACKAGING,
        ]),
    );
    templates
});

/// Parameter form for a product type
pub fn parameter_template(product_type: &str) -> Result<&'static [ParamField], ServiceError> {
    TEMPLATES
        .get(product_type)
        .map(Vec::as_slice)
        .ok_or_else(|| ServiceError::ValidationError(format!("Unknown product type: {}", product_type)))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        other => Some(other.to_string()),
    }
}

fn as_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_text).collect(),
        other => as_text(other)
            .map(|s| {
                s.split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Keep only template keys, coerce numbers, split colour lists and check sizes.
///
/// With `fill_missing`, absent template keys are written as `null`.
pub fn normalize_parameters(
    product_type: &str,
    input: &Value,
    fill_missing: bool,
) -> Result<Map<String, Value>, ServiceError> {
    let template = parameter_template(product_type)?;
    let empty = Map::new();
    let input = match input {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => {
            return Err(ServiceError::ValidationError(
                "Parameters must be an object".into(),
            ))
        }
    };

    let mut out = Map::new();
    for field in template {
        let Some(raw) = input.get(field.name) else {
            if fill_missing {
                out.insert(field.name.to_string(), Value::Null);
            }
            continue;
        };

        let value = match (field.name, field.kind) {
            ("colors", _) | (_, FieldKind::Checkbox) => {
                Value::Array(as_list(raw).into_iter().map(Value::String).collect())
            }
            (_, FieldKind::Number) => match as_text(raw) {
                None => Value::Null,
                Some(s) => {
                    let n: f64 = s.parse().map_err(|_| {
                        ServiceError::ValidationError(format!("{} must be a number", field.label))
                    })?;
                    serde_json::Number::from_f64(n)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            },
            (_, FieldKind::Select) => match as_text(raw) {
                None => Value::Null,
                Some(s) if field.options.contains(&s.as_str()) => Value::String(s),
                Some(s) => {
                    return Err(ServiceError::ValidationError(format!(
                        "{} must be one of {}, got {}",
                        field.label,
                        field.options.join(", "),
                        s
                    )))
                }
            },
            (_, FieldKind::Text) => as_text(raw).map(Value::String).unwrap_or(Value::Null),
        };
        out.insert(field.name.to_string(), value);
    }

    validate_sizes(&out)?;
    Ok(out)
}

fn validate_sizes(params: &Map<String, Value>) -> Result<(), ServiceError> {
    let (Some(Value::String(group)), Some(Value::Array(sizes))) =
        (params.get("target_group"), params.get("size_range"))
    else {
        return Ok(());
    };
    let allowed = size_range(group);
    for size in sizes.iter().filter_map(Value::as_str) {
        if !allowed.contains(&size) {
            return Err(ServiceError::ValidationError(format!(
                "Size {} is not offered for {}",
                size, group
            )));
        }
    }
    Ok(())
}

/// Next sequential product code after `latest`
pub fn next_product_code(latest: Option<&str>) -> String {
    let n = latest
        .and_then(|code| code.strip_prefix("PROD-"))
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("PROD-{:06}", n)
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewPrice {
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    pub product_type: String,
    #[serde(default)]
    pub is_processed: bool,
    #[validate(range(min = 0.0))]
    pub selling_price: f64,
    #[serde(default)]
    pub cost: f64,
    pub customer_id: Option<i32>,
    pub supplier: Option<String>,
    pub batch_number: Option<String>,
    #[validate(length(min = 1))]
    pub sku: String,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default = "default_true")]
    pub supports_direct_sales: bool,
    #[serde(default)]
    pub supports_service_sales: bool,
    pub uom: Option<String>,
    #[validate]
    pub initial_price: Option<NewPrice>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductChanges {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_processed: Option<bool>,
    #[validate(range(min = 0.0))]
    pub selling_price: Option<f64>,
    pub cost: Option<f64>,
    pub customer_id: Option<i32>,
    pub supplier: Option<String>,
    pub batch_number: Option<String>,
    #[validate(length(min = 1))]
    pub sku: Option<String>,
    pub stock_quantity: Option<i32>,
    pub parameters: Option<Value>,
    pub supports_direct_sales: Option<bool>,
    pub supports_service_sales: Option<bool>,
    pub uom: Option<String>,
    #[validate]
    pub new_price: Option<NewPrice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub product_type: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: product::Model,
    pub config: Option<product_config::Model>,
    pub prices: Vec<product_price::Model>,
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    uploads: UploadStore,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, uploads: UploadStore) -> Self {
        Self { db_pool, uploads }
    }

    async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    async fn customer_name<C: ConnectionTrait>(db: &C, customer_id: i32) -> Result<String, ServiceError> {
        customer::Entity::find_by_id(customer_id)
            .one(db)
            .await?
            .map(|c| c.name)
            .ok_or_else(|| ServiceError::not_found("Customer", customer_id))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn add(&self, input: NewProduct) -> Result<ProductDetails, ServiceError> {
        input.validate()?;
        let parameters = normalize_parameters(&input.product_type, &input.parameters, true)?;
        if let Some(price) = &input.initial_price {
            check_price_range(price)?;
        }

        let txn = self.db_pool.begin().await?;

        let customer_name = match input.customer_id {
            Some(id) => Some(Self::customer_name(&txn, id).await?),
            None => None,
        };

        let latest_code = product::Entity::find()
            .order_by_desc(product::Column::Id)
            .one(&txn)
            .await?
            .map(|p| p.product_code);
        let product_code = next_product_code(latest_code.as_deref());

        let now = Utc::now();
        let created = product::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            product_code: Set(product_code),
            product_type: Set(input.product_type),
            is_processed: Set(input.is_processed),
            selling_price: Set(input.selling_price),
            cost: Set(input.cost),
            customer_id: Set(input.customer_id),
            customer_name: Set(customer_name),
            supplier: Set(input.supplier),
            batch_number: Set(input.batch_number),
            sku: Set(input.sku),
            stock_quantity: Set(input.stock_quantity),
            image_path: Set(None),
            parameters: Set(Some(Value::Object(parameters))),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        product_config::ActiveModel {
            product_id: Set(created.id),
            supports_direct_sales: Set(input.supports_direct_sales),
            supports_service_sales: Set(input.supports_service_sales),
            uom: Set(input.uom.unwrap_or_else(|| "Pcs".to_string())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let Some(price) = input.initial_price {
            insert_price(&txn, created.id, &price).await?;
        }

        txn.commit().await?;
        info!(product_id = created.id, code = %created.product_code, "product added");
        self.get(created.id).await
    }

    #[instrument(skip(self, changes))]
    pub async fn edit(&self, id: i32, changes: ProductChanges) -> Result<ProductDetails, ServiceError> {
        changes.validate()?;
        if let Some(price) = &changes.new_price {
            check_price_range(price)?;
        }

        let txn = self.db_pool.begin().await?;
        let existing = Self::find(&txn, id).await?;

        let merged_parameters = match &changes.parameters {
            Some(update) => {
                let update = normalize_parameters(&existing.product_type, update, false)?;
                let mut merged = match existing.parameters.clone() {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                merged.extend(update);
                validate_sizes(&merged)?;
                Some(Value::Object(merged))
            }
            None => None,
        };

        let mut active = existing.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if changes.description.is_some() {
            active.description = Set(changes.description);
        }
        if let Some(v) = changes.is_processed {
            active.is_processed = Set(v);
        }
        if let Some(v) = changes.selling_price {
            active.selling_price = Set(v);
        }
        if let Some(v) = changes.cost {
            active.cost = Set(v);
        }
        if let Some(customer_id) = changes.customer_id {
            active.customer_name = Set(Some(Self::customer_name(&txn, customer_id).await?));
            active.customer_id = Set(Some(customer_id));
        }
        if changes.supplier.is_some() {
            active.supplier = Set(changes.supplier);
        }
        if changes.batch_number.is_some() {
            active.batch_number = Set(changes.batch_number);
        }
        if let Some(sku) = changes.sku {
            active.sku = Set(sku);
        }
        if let Some(qty) = changes.stock_quantity {
            active.stock_quantity = Set(qty);
        }
        if merged_parameters.is_some() {
            active.parameters = Set(merged_parameters);
        }
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        // Upsert the sales channel configuration
        let config = product_config::Entity::find()
            .filter(product_config::Column::ProductId.eq(id))
            .one(&txn)
            .await?;
        let mut config = match config {
            Some(c) => c.into_active_model(),
            None => product_config::ActiveModel {
                product_id: Set(id),
                supports_direct_sales: Set(true),
                supports_service_sales: Set(false),
                uom: Set("Pcs".to_string()),
                ..Default::default()
            },
        };
        if let Some(v) = changes.supports_direct_sales {
            config.supports_direct_sales = Set(v);
        }
        if let Some(v) = changes.supports_service_sales {
            config.supports_service_sales = Set(v);
        }
        if let Some(uom) = changes.uom {
            config.uom = Set(uom);
        }
        config.save(&txn).await?;

        if let Some(price) = changes.new_price {
            close_open_prices(&txn, id, price.start_date).await?;
            insert_price(&txn, id, &price).await?;
        }

        txn.commit().await?;
        info!(product_id = id, "product updated");
        self.get(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        Self::find(&txn, id).await?;

        let orders = order::Entity::find()
            .filter(order::Column::ProductId.eq(id))
            .count(&txn)
            .await?;
        let sales = sale::Entity::find()
            .filter(sale::Column::ProductId.eq(id))
            .count(&txn)
            .await?;
        if orders + sales > 0 {
            return Err(ServiceError::Conflict(
                "Product has orders or sales and cannot be deleted".into(),
            ));
        }

        let plan_ids: Vec<i32> = product_plan::Entity::find()
            .filter(product_plan::Column::ProductId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        plan_change_log::Entity::delete_many()
            .filter(plan_change_log::Column::PlanId.is_in(plan_ids))
            .exec(&txn)
            .await?;
        product_plan::Entity::delete_many()
            .filter(product_plan::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        sales_record::Entity::delete_many()
            .filter(sales_record::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        product_price::Entity::delete_many()
            .filter(product_price::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        product_config::Entity::delete_many()
            .filter(product_config::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        stock_item::Entity::update_many()
            .col_expr(stock_item::Column::ProductId, Expr::value(Option::<i32>::None))
            .filter(stock_item::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        product::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!(product_id = id, "product deleted");
        Ok(())
    }

    #[instrument(skip(self, bytes))]
    pub async fn upload_image(
        &self,
        id: i32,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<product::Model, ServiceError> {
        let existing = Self::find(&*self.db_pool, id).await?;
        let stored = self
            .uploads
            .save(PRODUCT_IMAGE_AREA, original_name, bytes, PRODUCT_IMAGE_EXTENSIONS)
            .await?;
        let mut active = existing.into_active_model();
        active.image_path = Set(Some(stored.clone()));
        active.updated_at = Set(Utc::now());
        match active.update(&*self.db_pool).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                self.uploads.discard(PRODUCT_IMAGE_AREA, &stored).await;
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: ProductFilter) -> Result<Vec<product::Model>, ServiceError> {
        let mut query = product::Entity::find();
        if let Some(product_type) = filter.product_type.filter(|t| !t.is_empty()) {
            query = query.filter(product::Column::ProductType.eq(product_type));
        }
        if let Some(q) = filter.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(&q))
                    .add(product::Column::ProductCode.contains(&q))
                    .add(product::Column::Sku.contains(&q)),
            );
        }
        Ok(query
            .order_by_desc(product::Column::Id)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<ProductDetails, ServiceError> {
        let db = &*self.db_pool;
        let product = Self::find(db, id).await?;
        let config = product_config::Entity::find()
            .filter(product_config::Column::ProductId.eq(id))
            .one(db)
            .await?;
        let prices = product_price::Entity::find()
            .filter(product_price::Column::ProductId.eq(id))
            .order_by_desc(product_price::Column::StartDate)
            .all(db)
            .await?;
        Ok(ProductDetails {
            product,
            config,
            prices,
        })
    }

    #[instrument(skip(self))]
    pub async fn prices(&self, id: i32) -> Result<Vec<product_price::Model>, ServiceError> {
        Ok(self.get(id).await?.prices)
    }
}

fn check_price_range(price: &NewPrice) -> Result<(), ServiceError> {
    match price.end_date {
        Some(end) if end < price.start_date => Err(ServiceError::ValidationError(
            "Price end date must not be before its start date".into(),
        )),
        _ => Ok(()),
    }
}

async fn insert_price<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    price: &NewPrice,
) -> Result<product_price::Model, ServiceError> {
    Ok(product_price::ActiveModel {
        product_id: Set(product_id),
        price: Set(price.price),
        start_date: Set(price.start_date),
        end_date: Set(price.end_date),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// End prices that are still open, or that run past `new_start`, on `new_start`.
async fn close_open_prices<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    new_start: NaiveDate,
) -> Result<(), ServiceError> {
    let overlapping = product_price::Entity::find()
        .filter(product_price::Column::ProductId.eq(product_id))
        .filter(product_price::Column::StartDate.lte(new_start))
        .filter(
            Condition::any()
                .add(product_price::Column::EndDate.is_null())
                .add(product_price::Column::EndDate.gte(new_start)),
        )
        .all(db)
        .await?;
    for price in overlapping {
        let mut active = price.into_active_model();
        active.end_date = Set(Some(new_start));
        active.update(db).await?;
    }
    Ok(())
}

/// Price in force on `date`: the latest-starting price that covers it, else 0.
pub fn price_on(prices: &[product_price::Model], date: NaiveDate) -> f64 {
    prices
        .iter()
        .filter(|p| p.covers(date))
        .max_by_key(|p| p.start_date)
        .map(|p| p.price)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(None, "PROD-000001")]
    #[case(Some("PROD-000041"), "PROD-000042")]
    #[case(Some("LEGACY-9"), "PROD-000001")]
    #[case(Some("PROD-abc"), "PROD-000001")]
    fn product_codes(#[case] latest: Option<&str>, #[case] expected: &str) {
        assert_eq!(next_product_code(latest), expected);
    }

    #[test]
    fn every_type_has_a_template() {
        for t in PRODUCT_TYPES {
            assert!(!parameter_template(t).unwrap().is_empty());
        }
        assert!(parameter_template("Leather").is_err());
    }

    #[test]
    fn normalises_numbers_colours_and_drops_unknown_keys() {
        let params = normalize_parameters(
            "Knitted",
            &json!({"fabric_gsm": "180", "colors": "red, blue ,", "bogus": 1}),
            true,
        )
        .unwrap();
        assert_eq!(params["fabric_gsm"], json!(180.0));
        assert_eq!(params["colors"], json!(["red", "blue"]));
        assert_eq!(params["gauge"], Value::Null);
        assert!(params.get("bogus").is_none());

        assert!(normalize_parameters("Knitted", &json!({"fabric_gsm": "heavy"}), false).is_err());
    }

    #[test]
    fn garment_sizes_must_match_target_group() {
        let ok = normalize_parameters(
            "Garment",
            &json!({"target_group": "Kids", "size_range": ["2T", "3T"]}),
            false,
        );
        assert!(ok.is_ok());

        let bad = normalize_parameters(
            "Garment",
            &json!({"target_group": "Newborn", "size_range": ["XL"]}),
            false,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn price_on_picks_latest_covering_price() {
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        let price = |id, price, start, end| product_price::Model {
            id,
            product_id: 1,
            price,
            start_date: start,
            end_date: end,
        };
        let prices = vec![
            price(1, 10.0, d(1, 1), Some(d(3, 1))),
            price(2, 12.0, d(3, 1), None),
        ];
        assert_eq!(price_on(&prices, d(2, 1)), 10.0);
        assert_eq!(price_on(&prices, d(3, 1)), 12.0);
        assert_eq!(price_on(&prices, d(6, 1)), 12.0);
        assert_eq!(price_on(&prices[..1], d(6, 1)), 0.0);
    }
}
