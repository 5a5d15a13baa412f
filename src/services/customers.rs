//! Customer and administrator accounts.
//!
//! Registration creates a `pending` account that can sign in and
//! browse immediately; ordering stays locked until an administrator
//! approves it. Accounts are never deleted, only deactivated, so
//! order history keeps a valid owner forever.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthService, IssuedToken, TokenKind};
use crate::entities::{
    admin_user, customer, AdminUser, AdminUserModel, Customer, CustomerModel, CustomerStatus,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::{normalize_page, Paginated};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterCustomerInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 200))]
    pub pharmacy_name: String,
    #[validate(length(min = 1, max = 120))]
    pub contact_name: String,
    #[validate(length(min = 5, max = 32))]
    pub phone: String,
    #[validate(length(max = 64))]
    pub license_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 200))]
    pub pharmacy_name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub contact_name: Option<String>,
    #[validate(length(min = 5, max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 64))]
    pub license_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub email: String,
    pub pharmacy_name: String,
    pub contact_name: String,
    pub phone: String,
    pub license_number: Option<String>,
    pub status: CustomerStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<CustomerModel> for CustomerResponse {
    fn from(model: CustomerModel) -> Self {
        Self {
            id: model.id,
            email: model.email,
            pharmacy_name: model.pharmacy_name,
            contact_name: model.contact_name,
            phone: model.phone,
            license_number: model.license_number,
            status: model.status,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<AdminUserModel> for AdminResponse {
    fn from(model: AdminUserModel) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            created_at: model.created_at,
        }
    }
}

/// Login/registration result: the token goes into the session cookie,
/// the profile into the response body.
#[derive(Debug)]
pub struct CustomerSession {
    pub customer: CustomerResponse,
    pub token: IssuedToken,
}

#[derive(Debug)]
pub struct AdminSession {
    pub admin: AdminResponse,
    pub token: IssuedToken,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AdminCustomerListParams {
    pub status: Option<CustomerStatus>,
    /// Matches against email, pharmacy name, and contact name
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveInput {
    pub is_active: bool,
}

#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
    auth: AuthService,
    event_sender: Arc<EventSender>,
}

impl CustomerService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: AuthService,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            auth,
            event_sender,
        }
    }

    #[instrument(skip(self, input))]
    pub async fn register(
        &self,
        input: RegisterCustomerInput,
    ) -> Result<CustomerSession, ServiceError> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();

        let existing = Customer::find()
            .filter(customer::Column::Email.eq(&email))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(
                "Email already registered".into(),
            ));
        }

        let password_hash = self.auth.hash_password(&input.password)?;
        let now = Utc::now();
        let customer = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(password_hash),
            pharmacy_name: Set(input.pharmacy_name),
            contact_name: Set(input.contact_name),
            phone: Set(input.phone),
            license_number: Set(input.license_number),
            status: Set(CustomerStatus::Pending),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(customer_id = %customer.id, "customer registered");
        self.event_sender
            .send_or_log(Event::CustomerRegistered {
                customer_id: customer.id,
            })
            .await;

        let token = self
            .auth
            .issue_token(TokenKind::Customer, customer.id, &customer.email)?;
        Ok(CustomerSession {
            customer: customer.into(),
            token,
        })
    }

    /// Pending accounts may sign in (to manage their profile while the
    /// review runs); rejected, suspended, and deactivated ones may not.
    #[instrument(skip(self, input))]
    pub async fn login(&self, input: LoginInput) -> Result<CustomerSession, ServiceError> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();

        let customer = Customer::find()
            .filter(customer::Column::Email.eq(&email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid email or password".into()))?;

        self.auth
            .verify_password(&input.password, &customer.password_hash)?;

        if !customer.is_active
            || matches!(
                customer.status,
                CustomerStatus::Rejected | CustomerStatus::Suspended
            )
        {
            return Err(ServiceError::Unauthorized(
                "Account is suspended or deactivated".into(),
            ));
        }

        let token = self
            .auth
            .issue_token(TokenKind::Customer, customer.id, &customer.email)?;
        info!(customer_id = %customer.id, "customer signed in");
        Ok(CustomerSession {
            customer: customer.into(),
            token,
        })
    }

    pub async fn me(&self, customer_id: Uuid) -> Result<CustomerResponse, ServiceError> {
        self.require_customer(customer_id).await.map(Into::into)
    }

    #[instrument(skip(self, input), fields(customer_id = %customer_id))]
    pub async fn update_profile(
        &self,
        customer_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<CustomerResponse, ServiceError> {
        input.validate()?;
        let customer = self.require_customer(customer_id).await?;

        let mut active = customer.into_active_model();
        if let Some(pharmacy_name) = input.pharmacy_name {
            active.pharmacy_name = Set(pharmacy_name);
        }
        if let Some(contact_name) = input.contact_name {
            active.contact_name = Set(contact_name);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(phone);
        }
        if let Some(license_number) = input.license_number {
            active.license_number = Set(Some(license_number));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        info!(customer_id = %customer_id, "customer profile updated");
        Ok(updated.into())
    }

    #[instrument(skip(self, input))]
    pub async fn admin_login(&self, input: LoginInput) -> Result<AdminSession, ServiceError> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();

        let admin = AdminUser::find()
            .filter(admin_user::Column::Email.eq(&email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid email or password".into()))?;

        self.auth
            .verify_password(&input.password, &admin.password_hash)?;
        if !admin.is_active {
            return Err(ServiceError::Unauthorized(
                "Account is suspended or deactivated".into(),
            ));
        }

        let token = self
            .auth
            .issue_token(TokenKind::Admin, admin.id, &admin.email)?;
        info!(admin_id = %admin.id, "admin signed in");
        Ok(AdminSession {
            admin: admin.into(),
            token,
        })
    }

    pub async fn admin_me(&self, admin_id: Uuid) -> Result<AdminResponse, ServiceError> {
        AdminUser::find_by_id(admin_id)
            .one(&*self.db)
            .await?
            .map(Into::into)
            .ok_or_else(|| ServiceError::NotFound("Admin account not found".into()))
    }

    #[instrument(skip(self))]
    pub async fn admin_list(
        &self,
        params: AdminCustomerListParams,
    ) -> Result<Paginated<CustomerResponse>, ServiceError> {
        let (page, per_page) = normalize_page(params.page, params.per_page);

        let mut query = Customer::find();
        if let Some(status) = params.status {
            query = query.filter(customer::Column::Status.eq(status));
        }
        if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(customer::Column::Email.contains(q))
                    .add(customer::Column::PharmacyName.contains(q))
                    .add(customer::Column::ContactName.contains(q)),
            );
        }

        let paginator = query
            .order_by_desc(customer::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(CustomerResponse::from)
            .collect();

        Ok(Paginated {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn admin_get(&self, customer_id: Uuid) -> Result<CustomerResponse, ServiceError> {
        self.require_customer(customer_id).await.map(Into::into)
    }

    pub async fn approve(
        &self,
        customer_id: Uuid,
        actor: &str,
    ) -> Result<CustomerResponse, ServiceError> {
        self.transition(
            customer_id,
            actor,
            "approve",
            &[CustomerStatus::Pending, CustomerStatus::Rejected],
            CustomerStatus::Approved,
        )
        .await
    }

    pub async fn reject(
        &self,
        customer_id: Uuid,
        actor: &str,
    ) -> Result<CustomerResponse, ServiceError> {
        self.transition(
            customer_id,
            actor,
            "reject",
            &[CustomerStatus::Pending],
            CustomerStatus::Rejected,
        )
        .await
    }

    pub async fn suspend(
        &self,
        customer_id: Uuid,
        actor: &str,
    ) -> Result<CustomerResponse, ServiceError> {
        self.transition(
            customer_id,
            actor,
            "suspend",
            &[CustomerStatus::Approved],
            CustomerStatus::Suspended,
        )
        .await
    }

    /// Lifts a suspension; the account returns to `approved`.
    pub async fn reactivate(
        &self,
        customer_id: Uuid,
        actor: &str,
    ) -> Result<CustomerResponse, ServiceError> {
        self.transition(
            customer_id,
            actor,
            "reactivate",
            &[CustomerStatus::Suspended],
            CustomerStatus::Approved,
        )
        .await
    }

    #[instrument(skip(self), fields(customer_id = %customer_id, actor = %actor))]
    pub async fn set_active(
        &self,
        customer_id: Uuid,
        actor: &str,
        input: SetActiveInput,
    ) -> Result<CustomerResponse, ServiceError> {
        let customer = self.require_customer(customer_id).await?;
        if customer.is_active == input.is_active {
            return Ok(customer.into());
        }

        let mut active = customer.into_active_model();
        active.is_active = Set(input.is_active);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(is_active = input.is_active, "customer active flag changed");
        Ok(updated.into())
    }

    async fn require_customer(&self, customer_id: Uuid) -> Result<CustomerModel, ServiceError> {
        Customer::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))
    }

    async fn transition(
        &self,
        customer_id: Uuid,
        actor: &str,
        verb: &str,
        allowed_from: &[CustomerStatus],
        to: CustomerStatus,
    ) -> Result<CustomerResponse, ServiceError> {
        let customer = self.require_customer(customer_id).await?;
        let from = customer.status;

        if from == to {
            return Err(ServiceError::ValidationError(format!(
                "Customer is already {}",
                status_label(to)
            )));
        }
        if !allowed_from.contains(&from) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot {} a customer whose status is {}",
                verb,
                status_label(from)
            )));
        }

        let mut active = customer.into_active_model();
        active.status = Set(to);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(
            customer_id = %customer_id,
            actor = %actor,
            from = status_label(from),
            to = status_label(to),
            "customer status changed"
        );
        self.event_sender
            .send_or_log(Event::CustomerStatusChanged {
                customer_id,
                old_status: from,
                new_status: to,
            })
            .await;

        Ok(updated.into())
    }
}

fn status_label(status: CustomerStatus) -> &'static str {
    match status {
        CustomerStatus::Pending => "pending",
        CustomerStatus::Approved => "approved",
        CustomerStatus::Rejected => "rejected",
        CustomerStatus::Suspended => "suspended",
    }
}
