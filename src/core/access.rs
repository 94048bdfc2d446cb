//! Access gate - Role-based permission checks.
//!
//! A caller is identified by [`Principal`]. The gate resolves user → role → access
//! record and reads the boolean group of the requested [`FeatureArea`]. Every
//! missing link (unknown user, inactive user, no role, no access record) denies.

use crate::{
    entities::{Access, Role, User, access, role},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, instrument};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Row id of the calling user
    pub user_id: i64,
}

/// Feature areas of the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureArea {
    /// Dashboard
    Dashboard,
    /// Task board
    Task,
    /// Project tracker
    ProjectTracker,
    /// Employee onboarding
    Onboarding,
    /// Attendance
    Attendance,
    /// Customers
    Customer,
    /// Product catalog
    Product,
    /// Enquiries
    Enquiry,
    /// Quotations
    Quotation,
    /// Sales orders
    SalesOrder,
}

impl FeatureArea {
    /// Every area, in matrix order.
    pub const ALL: [Self; 10] = [
        Self::Dashboard,
        Self::Task,
        Self::ProjectTracker,
        Self::Onboarding,
        Self::Attendance,
        Self::Customer,
        Self::Product,
        Self::Enquiry,
        Self::Quotation,
        Self::SalesOrder,
    ];

    /// Name used in configuration and column prefixes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Task => "task",
            Self::ProjectTracker => "project_tracker",
            Self::Onboarding => "onboarding",
            Self::Attendance => "attendance",
            Self::Customer => "customer",
            Self::Product => "product",
            Self::Enquiry => "enquiry",
            Self::Quotation => "quotation",
            Self::SalesOrder => "sales_order",
        }
    }
}

impl FromStr for FeatureArea {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        Self::ALL.into_iter().find(|area| area.as_str() == s).ok_or(())
    }
}

/// Actions checked by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read records
    View,
    /// Create records
    Create,
    /// Modify records
    Edit,
    /// Remove records
    Delete,
}

impl Action {
    /// Every action.
    pub const ALL: [Self; 4] = [Self::View, Self::Create, Self::Edit, Self::Delete];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        Self::ALL.into_iter().find(|action| action.as_str() == s).ok_or(())
    }
}

/// The five booleans of one feature area.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    /// Implies the four narrower flags at check time
    pub full_access: bool,
    /// May view
    pub view: bool,
    /// May create
    pub create: bool,
    /// May edit
    pub edit: bool,
    /// May delete
    pub delete: bool,
}

impl PermissionGroup {
    /// Everything allowed.
    pub const FULL: Self = Self {
        full_access: true,
        view: true,
        create: true,
        edit: true,
        delete: true,
    };

    /// Builds a group from permission names (`full_access`, `view`, `create`,
    /// `edit`, `delete`). Returns `None` on an unknown name.
    #[must_use]
    pub fn from_names(names: &[String]) -> Option<Self> {
        let mut group = Self::default();
        for name in names {
            match name.trim() {
                "full_access" => group.full_access = true,
                "view" => group.view = true,
                "create" => group.create = true,
                "edit" => group.edit = true,
                "delete" => group.delete = true,
                _ => return None,
            }
        }
        Some(group)
    }

    /// Whether `action` is allowed, honouring `full_access`.
    #[must_use]
    pub const fn allows(self, action: Action) -> bool {
        self.full_access
            || match action {
                Action::View => self.view,
                Action::Create => self.create,
                Action::Edit => self.edit,
                Action::Delete => self.delete,
            }
    }
}

macro_rules! matrix_columns {
    ($($area:ident => $full:ident, $view:ident, $create:ident, $edit:ident, $delete:ident;)*) => {
        /// Reads the stored group of `area`.
        #[must_use]
        pub const fn group_of(record: &access::Model, area: FeatureArea) -> PermissionGroup {
            match area {
                $(FeatureArea::$area => PermissionGroup {
                    full_access: record.$full,
                    view: record.$view,
                    create: record.$create,
                    edit: record.$edit,
                    delete: record.$delete,
                },)*
            }
        }

        /// Overwrites the group of `area` on an access record being saved.
        pub fn set_group(record: &mut access::ActiveModel, area: FeatureArea, group: PermissionGroup) {
            match area {
                $(FeatureArea::$area => {
                    record.$full = Set(group.full_access);
                    record.$view = Set(group.view);
                    record.$create = Set(group.create);
                    record.$edit = Set(group.edit);
                    record.$delete = Set(group.delete);
                })*
            }
        }
    };
}

matrix_columns! {
    Dashboard => dashboard_full_access, dashboard_view, dashboard_create, dashboard_edit, dashboard_delete;
    Task => task_full_access, task_view, task_create, task_edit, task_delete;
    ProjectTracker => project_tracker_full_access, project_tracker_view, project_tracker_create,
        project_tracker_edit, project_tracker_delete;
    Onboarding => onboarding_full_access, onboarding_view, onboarding_create, onboarding_edit,
        onboarding_delete;
    Attendance => attendance_full_access, attendance_view, attendance_create, attendance_edit,
        attendance_delete;
    Customer => customer_full_access, customer_view, customer_create, customer_edit, customer_delete;
    Product => product_full_access, product_view, product_create, product_edit, product_delete;
    Enquiry => enquiry_full_access, enquiry_view, enquiry_create, enquiry_edit, enquiry_delete;
    Quotation => quotation_full_access, quotation_view, quotation_create, quotation_edit,
        quotation_delete;
    SalesOrder => sales_order_full_access, sales_order_view, sales_order_create, sales_order_edit,
        sales_order_delete;
}

/// Checks one `(area, action)` pair against an access record.
#[must_use]
pub const fn permits(record: &access::Model, area: FeatureArea, action: Action) -> bool {
    group_of(record, area).allows(action)
}

/// Loads the active role of `principal`, or `None` when any link is missing.
pub async fn resolve_role<C>(db: &C, principal: Principal) -> Result<Option<role::Model>>
where
    C: ConnectionTrait,
{
    let Some(user) = User::find_by_id(principal.user_id).one(db).await? else {
        debug!(user_id = principal.user_id, "Unknown principal");
        return Ok(None);
    };
    if !user.is_active {
        debug!(user_id = user.id, "Inactive principal");
        return Ok(None);
    }
    let Some(role_id) = user.role_id else {
        return Ok(None);
    };
    Role::find_by_id(role_id).one(db).await.map_err(Into::into)
}

/// Whether `principal` may perform `action` on `area`.
#[instrument(skip(db))]
pub async fn authorize<C>(
    db: &C,
    principal: Principal,
    area: FeatureArea,
    action: Action,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Some(role) = resolve_role(db, principal).await? else {
        return Ok(false);
    };
    let record = Access::find()
        .filter(access::Column::RoleId.eq(role.id))
        .one(db)
        .await?;

    let allowed = record.is_some_and(|record| permits(&record, area, action));
    debug!(role = %role.name, allowed, "Access check");
    Ok(allowed)
}

/// [`authorize`] with textual area and action names. Unknown names deny.
pub async fn authorize_named<C>(
    db: &C,
    principal: Principal,
    area: &str,
    action: &str,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let (Ok(area), Ok(action)) = (area.parse::<FeatureArea>(), action.parse::<Action>()) else {
        debug!(area, action, "Unknown permission name");
        return Ok(false);
    };
    authorize(db, principal, area, action).await
}

/// Like [`authorize`] but fails with [`Error::PermissionDenied`].
pub async fn require<C>(db: &C, principal: Principal, area: FeatureArea, action: Action) -> Result<()>
where
    C: ConnectionTrait,
{
    if authorize(db, principal, area, action).await? {
        Ok(())
    } else {
        Err(Error::PermissionDenied {
            area: area.as_str().to_string(),
            action: action.as_str().to_string(),
        })
    }
}

/// Requires the principal's role to carry the `is_admin` flag.
pub async fn require_admin<C>(db: &C, principal: Principal) -> Result<role::Model>
where
    C: ConnectionTrait,
{
    match resolve_role(db, principal).await? {
        Some(role) if role.is_admin => Ok(role),
        _ => Err(Error::PermissionDenied {
            area: "administration".to_string(),
            action: "manage".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_full_access_implies_everything() {
        let group = PermissionGroup {
            full_access: true,
            ..PermissionGroup::default()
        };
        for action in Action::ALL {
            assert!(group.allows(action));
        }
        assert!(!PermissionGroup::default().allows(Action::View));
    }

    #[test]
    fn test_from_names() {
        let names = vec!["view".to_string(), "delete".to_string()];
        let group = PermissionGroup::from_names(&names).unwrap_or_default();
        assert!(group.view && group.delete && !group.create && !group.full_access);
        assert!(PermissionGroup::from_names(&["admin".to_string()]).is_none());
    }

    #[test]
    fn test_names_parse() {
        assert_eq!("sales_order".parse::<FeatureArea>(), Ok(FeatureArea::SalesOrder));
        assert_eq!("project_tracker".parse::<FeatureArea>(), Ok(FeatureArea::ProjectTracker));
        assert_eq!("edit".parse::<Action>(), Ok(Action::Edit));
        assert!("SalesOrder".parse::<FeatureArea>().is_err());
        assert!("approve".parse::<Action>().is_err());
    }

    #[test]
    fn test_matrix_columns_are_wired_per_area() {
        let edit_only = PermissionGroup {
            edit: true,
            ..PermissionGroup::default()
        };
        for area in FeatureArea::ALL {
            let mut record = <access::ActiveModel as Default>::default();
            set_group(&mut record, area, edit_only);
            assert_eq!(record.customer_edit == Set(true), area == FeatureArea::Customer);
            assert_eq!(record.sales_order_edit == Set(true), area == FeatureArea::SalesOrder);
        }

        let model = access::Model {
            sales_order_view: true,
            ..access::Model::default()
        };
        assert!(permits(&model, FeatureArea::SalesOrder, Action::View));
        assert!(!permits(&model, FeatureArea::Quotation, Action::View));
        assert!(!permits(&model, FeatureArea::SalesOrder, Action::Edit));
    }

    #[tokio::test]
    async fn test_unknown_names_deny_without_storage() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let principal = Principal { user_id: 1 };

        assert!(!authorize_named(&db, principal, "payroll", "view").await?);
        assert!(!authorize_named(&db, principal, "customer", "approve").await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_role_grants_are_checked() -> Result<()> {
        let db = setup_test_db().await?;
        let sales = PermissionGroup {
            view: true,
            create: true,
            ..PermissionGroup::default()
        };
        let user = create_user_with_access(&db, "rep", &[(FeatureArea::Customer, sales)]).await?;
        let principal = Principal { user_id: user.id };

        assert!(authorize(&db, principal, FeatureArea::Customer, Action::View).await?);
        assert!(authorize(&db, principal, FeatureArea::Customer, Action::Create).await?);
        assert!(!authorize(&db, principal, FeatureArea::Customer, Action::Delete).await?);
        assert!(!authorize(&db, principal, FeatureArea::Product, Action::View).await?);
        assert!(authorize_named(&db, principal, "customer", "view").await?);

        let denied = require(&db, principal, FeatureArea::Customer, Action::Delete).await;
        assert!(matches!(
            denied,
            Err(Error::PermissionDenied { area, action }) if area == "customer" && action == "delete"
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_full_access_is_read_at_check_time() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user_with_access(
            &db,
            "lead",
            &[(FeatureArea::Quotation, PermissionGroup { full_access: true, ..PermissionGroup::default() })],
        )
        .await?;
        let principal = Principal { user_id: user.id };

        assert!(authorize(&db, principal, FeatureArea::Quotation, Action::Delete).await?);

        // The stored narrower flags stay untouched
        let record = Access::find().one(&db).await?.unwrap_or_default();
        assert!(record.quotation_full_access);
        assert!(!record.quotation_delete);

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_links_deny() -> Result<()> {
        let db = setup_test_db().await?;

        // No such user
        assert!(!authorize(&db, Principal { user_id: 999 }, FeatureArea::Dashboard, Action::View).await?);

        // User without a role
        let loner = create_test_user(&db, "loner", None).await?;
        assert!(!authorize(&db, Principal { user_id: loner.id }, FeatureArea::Dashboard, Action::View).await?);

        // Role without an access record
        let role = create_bare_role(&db, "Orphan").await?;
        let orphan = create_test_user(&db, "orphan", Some(role.id)).await?;
        assert!(!authorize(&db, Principal { user_id: orphan.id }, FeatureArea::Dashboard, Action::View).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_user_is_denied() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user_with_access(&db, "gone", &[(FeatureArea::Customer, PermissionGroup::FULL)]).await?;

        let mut active: crate::entities::user::ActiveModel = user.clone().into();
        active.is_active = Set(false);
        active.update(&db).await?;

        let principal = Principal { user_id: user.id };
        assert!(!authorize(&db, principal, FeatureArea::Customer, Action::View).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_require_admin_uses_flag() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_admin(&db).await?;
        let rep = create_user_with_access(&db, "rep", &[(FeatureArea::Customer, PermissionGroup::FULL)]).await?;

        assert!(require_admin(&db, Principal { user_id: admin.id }).await?.is_admin);
        assert!(matches!(
            require_admin(&db, Principal { user_id: rep.id }).await,
            Err(Error::PermissionDenied { .. })
        ));

        Ok(())
    }
}
