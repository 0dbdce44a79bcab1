/*!
 * # Permissions Module
 *
 * Users carry a JSON document of the form `{"orders": {"view": true, "edit": false}}`.
 * Tokens carry the same information flattened into `module:action` strings, which is
 * what route guards check.
 */

use crate::errors::ServiceError;
use serde_json::{json, Map, Value};

/// Permission actions
pub struct Actions;

impl Actions {
    pub const VIEW: &'static str = "view";
    pub const EDIT: &'static str = "edit";
    pub const DELETE: &'static str = "delete";
    pub const ALL: [&'static str; 3] = [Self::VIEW, Self::EDIT, Self::DELETE];
}

/// Permission modules
pub struct Modules;

impl Modules {
    pub const DASHBOARD: &'static str = "dashboard";
    pub const ORDERS: &'static str = "orders";
    pub const PRODUCTS: &'static str = "products";
    pub const CUSTOMERS: &'static str = "customers";
    pub const HR: &'static str = "hr";
    pub const NOTIFICATIONS: &'static str = "notifications";
    pub const PLANNING: &'static str = "planning";
    pub const PRODUCTION: &'static str = "production";
    pub const PROJECT: &'static str = "project";
    pub const PURCHASING: &'static str = "purchasing";
    pub const STOCK_MANAGEMENT: &'static str = "stock_management";
    pub const SALES: &'static str = "sales";
    pub const SYSTEM_SETUP: &'static str = "system_setup";
    pub const USER_MANAGEMENT: &'static str = "user_management";
    pub const ADMIN_ACTIVITIES: &'static str = "admin_activities";
    pub const RESOURCES: &'static str = "resources";

    pub const ALL: [&'static str; 16] = [
        Self::DASHBOARD,
        Self::ORDERS,
        Self::PRODUCTS,
        Self::CUSTOMERS,
        Self::HR,
        Self::NOTIFICATIONS,
        Self::PLANNING,
        Self::PRODUCTION,
        Self::PROJECT,
        Self::PURCHASING,
        Self::STOCK_MANAGEMENT,
        Self::SALES,
        Self::SYSTEM_SETUP,
        Self::USER_MANAGEMENT,
        Self::ADMIN_ACTIVITIES,
        Self::RESOURCES,
    ];

    pub fn is_known(module: &str) -> bool {
        Self::ALL.contains(&module)
    }
}

/// Common permission string constants used by route guards
pub mod consts {
    pub const DASHBOARD_VIEW: &str = "dashboard:view";

    pub const ORDERS_VIEW: &str = "orders:view";
    pub const ORDERS_EDIT: &str = "orders:edit";

    pub const PRODUCTS_VIEW: &str = "products:view";
    pub const PRODUCTS_EDIT: &str = "products:edit";
    pub const PRODUCTS_DELETE: &str = "products:delete";

    pub const CUSTOMERS_VIEW: &str = "customers:view";
    pub const CUSTOMERS_EDIT: &str = "customers:edit";

    pub const SALES_VIEW: &str = "sales:view";
    pub const SALES_EDIT: &str = "sales:edit";

    pub const PLANNING_VIEW: &str = "planning:view";
    pub const PLANNING_EDIT: &str = "planning:edit";
    pub const PLANNING_DELETE: &str = "planning:delete";

    pub const PURCHASING_VIEW: &str = "purchasing:view";
    pub const PURCHASING_EDIT: &str = "purchasing:edit";
    pub const PURCHASING_DELETE: &str = "purchasing:delete";

    pub const STOCK_VIEW: &str = "stock_management:view";
    pub const STOCK_EDIT: &str = "stock_management:edit";

    pub const PRODUCTION_VIEW: &str = "production:view";
    pub const PRODUCTION_EDIT: &str = "production:edit";

    pub const HR_VIEW: &str = "hr:view";
    pub const HR_EDIT: &str = "hr:edit";
    pub const HR_DELETE: &str = "hr:delete";

    pub const PROJECT_VIEW: &str = "project:view";
    pub const PROJECT_EDIT: &str = "project:edit";

    pub const ADMIN_ACTIVITIES_VIEW: &str = "admin_activities:view";
    pub const ADMIN_ACTIVITIES_EDIT: &str = "admin_activities:edit";
    pub const ADMIN_ACTIVITIES_DELETE: &str = "admin_activities:delete";

    pub const SYSTEM_SETUP_EDIT: &str = "system_setup:edit";
    pub const SYSTEM_SETUP_DELETE: &str = "system_setup:delete";

    pub const NOTIFICATIONS_VIEW: &str = "notifications:view";
    pub const RESOURCES_VIEW: &str = "resources:view";
}

/// Build a permission string from a module and an action
pub fn format_permission(module: &str, action: &str) -> String {
    format!("{}:{}", module, action)
}

/// Permissions granted to newly registered users when none are supplied.
pub fn default_permissions() -> Value {
    json!({ "dashboard": { "view": true } })
}

/// Every flag on every module. Used for the seeded administrator.
pub fn all_permissions() -> Value {
    let mut doc = Map::new();
    for module in Modules::ALL {
        let mut actions = Map::new();
        for action in Actions::ALL {
            actions.insert(action.to_string(), Value::Bool(true));
        }
        doc.insert(module.to_string(), Value::Object(actions));
    }
    Value::Object(doc)
}

/// Flatten a permission document into `module:action` strings.
///
/// Anything that is not an object of booleans is ignored.
pub fn flatten_permissions(doc: &Value) -> Vec<String> {
    let mut flat = Vec::new();
    if let Some(modules) = doc.as_object() {
        for (module, actions) in modules {
            if let Some(actions) = actions.as_object() {
                for (action, granted) in actions {
                    if granted.as_bool().unwrap_or(false) {
                        flat.push(format_permission(module, action));
                    }
                }
            }
        }
    }
    flat.sort();
    flat
}

/// Validate and normalise a permission update.
///
/// Only known modules and actions are accepted, and modules with no flag set are dropped.
pub fn normalize_permissions(input: &Value) -> Result<Value, ServiceError> {
    let modules = input.as_object().ok_or_else(|| {
        ServiceError::ValidationError("Permissions must be an object keyed by module".into())
    })?;

    let mut normalized = Map::new();
    for (module, actions) in modules {
        if !Modules::is_known(module) {
            return Err(ServiceError::ValidationError(format!(
                "Unknown permission module: {}",
                module
            )));
        }
        let actions = actions.as_object().ok_or_else(|| {
            ServiceError::ValidationError(format!("Permissions for {} must be an object", module))
        })?;

        let mut kept = Map::new();
        for action in Actions::ALL {
            let granted = actions
                .get(action)
                .and_then(Value::as_bool)
                .unwrap_or(false);
            kept.insert(action.to_string(), Value::Bool(granted));
        }
        if kept.values().any(|v| v.as_bool() == Some(true)) {
            normalized.insert(module.clone(), Value::Object(kept));
        }
    }

    if normalized.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one permission must be granted".into(),
        ));
    }
    Ok(Value::Object(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_keeps_only_granted_flags() {
        let doc = json!({
            "orders": {"view": true, "edit": false},
            "stock_management": {"view": true, "delete": true},
            "junk": 5
        });
        assert_eq!(
            flatten_permissions(&doc),
            vec![
                "orders:view".to_string(),
                "stock_management:delete".to_string(),
                "stock_management:view".to_string(),
            ]
        );
    }

    #[test]
    fn normalize_drops_empty_modules_and_rejects_unknown() {
        let doc = json!({
            "orders": {"view": true},
            "hr": {"view": false, "edit": false}
        });
        let normalized = normalize_permissions(&doc).unwrap();
        assert!(normalized.get("hr").is_none());
        assert_eq!(normalized["orders"]["view"], json!(true));
        assert_eq!(normalized["orders"]["delete"], json!(false));

        assert!(normalize_permissions(&json!({"chat": {"view": true}})).is_err());
        assert!(normalize_permissions(&json!({"hr": {"view": false}})).is_err());
    }

    #[test]
    fn all_permissions_cover_every_module() {
        let flat = flatten_permissions(&all_permissions());
        assert_eq!(flat.len(), Modules::ALL.len() * Actions::ALL.len());
        assert!(flat.contains(&consts::PLANNING_DELETE.to_string()));
    }
}
