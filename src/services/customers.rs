use crate::{
    db::DbPool,
    entities::{customer, order},
    errors::ServiceError,
    services::exports::{money, opt_string, CsvExport},
    services::periods::round2,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

/// Digits with optional leading `+`, spaces or dashes, e.g. `+251 911-234567`
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,18}[0-9]$").expect("valid phone pattern"));

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCustomer {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(regex = "PHONE_RE")]
    pub phone_number: Option<String>,
    pub location_address: Option<String>,
    pub product_types: Option<String>,
    pub contact_details: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CustomerChanges {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(regex = "PHONE_RE")]
    pub phone_number: Option<String>,
    pub location_address: Option<String>,
    pub product_types: Option<String>,
    pub contact_details: Option<String>,
}

/// `round(count / max × 5, 2)`, 0 when nobody has ordered
pub fn rating_for(order_count: u64, max_count: u64) -> f64 {
    if max_count == 0 {
        0.0
    } else {
        round2(order_count as f64 / max_count as f64 * 5.0)
    }
}

#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub async fn get(&self, id: i32) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Customer", id))
    }

    async fn ensure_email_free(&self, email: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = customer::Entity::find().filter(customer::Column::Email.eq(email));
        if let Some(id) = except {
            query = query.filter(customer::Column::Id.ne(id));
        }
        if query.one(&*self.db_pool).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A customer with email {} already exists",
                email
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn add(&self, input: NewCustomer) -> Result<customer::Model, ServiceError> {
        input.validate()?;
        self.ensure_email_free(&input.email, None).await?;
        let created = customer::ActiveModel {
            name: Set(input.name),
            email: Set(input.email),
            phone_number: Set(input.phone_number),
            location_address: Set(input.location_address),
            product_types: Set(input.product_types),
            rating: Set(0.0),
            contact_details: Set(input.contact_details),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        info!(customer_id = created.id, "customer added");
        Ok(created)
    }

    #[instrument(skip(self, changes))]
    pub async fn edit(&self, id: i32, changes: CustomerChanges) -> Result<customer::Model, ServiceError> {
        changes.validate()?;
        let mut active = self.get(id).await?.into_active_model();
        if let Some(email) = changes.email {
            self.ensure_email_free(&email, Some(id)).await?;
            active.email = Set(email);
        }
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if changes.phone_number.is_some() {
            active.phone_number = Set(changes.phone_number);
        }
        if changes.location_address.is_some() {
            active.location_address = Set(changes.location_address);
        }
        if changes.product_types.is_some() {
            active.product_types = Set(changes.product_types);
        }
        if changes.contact_details.is_some() {
            active.contact_details = Set(changes.contact_details);
        }
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Recompute every customer's rating from order volume
    #[instrument(skip(self))]
    pub async fn refresh_ratings(&self) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let mut counts: HashMap<i32, u64> = HashMap::new();
        for o in order::Entity::find().all(&txn).await? {
            *counts.entry(o.customer_id).or_default() += 1;
        }
        let max_count = counts.values().copied().max().unwrap_or(0);

        for c in customer::Entity::find().all(&txn).await? {
            let rating = rating_for(counts.get(&c.id).copied().unwrap_or(0), max_count);
            if (c.rating - rating).abs() > f64::EPSILON {
                let mut active = c.into_active_model();
                active.rating = Set(rating);
                active.update(&txn).await?;
            }
        }
        txn.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<customer::Model>, ServiceError> {
        self.refresh_ratings().await?;
        Ok(customer::Entity::find()
            .order_by_desc(customer::Column::Id)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn export(&self) -> Result<CsvExport, ServiceError> {
        let customers = self.list().await?;
        CsvExport::build(
            "customers.csv",
            &["Name", "Email", "Phone", "Location", "Product Types", "Rating"],
            customers.into_iter().map(|c| {
                vec![
                    c.name,
                    c.email,
                    opt_string(c.phone_number.as_deref()),
                    opt_string(c.location_address.as_deref()),
                    opt_string(c.product_types.as_deref()),
                    money(c.rating),
                ]
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_scale_to_busiest_customer() {
        assert_eq!(rating_for(0, 0), 0.0);
        assert_eq!(rating_for(4, 4), 5.0);
        assert_eq!(rating_for(1, 3), 1.67);
        assert_eq!(rating_for(0, 3), 0.0);
    }

    #[test]
    fn phone_numbers_are_checked() {
        let mut customer = NewCustomer {
            name: "Habesha Garments".into(),
            email: "sales@habesha.et".into(),
            phone_number: Some("+251 911-234567".into()),
            location_address: None,
            product_types: None,
            contact_details: None,
        };
        assert!(customer.validate().is_ok());
        customer.phone_number = Some("call me".into());
        assert!(customer.validate().is_err());
        customer.phone_number = None;
        assert!(customer.validate().is_ok());
    }
}
