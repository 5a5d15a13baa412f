//! Outbound customer notifications and invoice rendering.
//!
//! Everything here is fired from the event loop after an order is
//! already committed; failures are logged and never block placement.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::EmailConfig;
use crate::entities::{CustomerModel, OrderItemModel, OrderModel};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Mail API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Notifications misconfigured: {0}")]
    Config(String),
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

/// Builds the configured email backend
pub fn from_config(cfg: &EmailConfig) -> Result<Arc<dyn EmailClient>, NotificationError> {
    match cfg.backend.to_ascii_lowercase().as_str() {
        "log" => Ok(Arc::new(LogEmailClient)),
        "http" => {
            let endpoint = cfg
                .endpoint
                .clone()
                .ok_or_else(|| NotificationError::Config("email.endpoint is required".into()))?;
            Ok(Arc::new(HttpEmailClient::new(
                endpoint,
                cfg.api_key.clone(),
                cfg.from_address.clone(),
                cfg.from_name.clone(),
            )))
        }
        other => Err(NotificationError::Config(format!(
            "unknown email backend '{}'",
            other
        ))),
    }
}

/// Development backend: writes the message to the log instead of
/// delivering it.
pub struct LogEmailClient;

#[async_trait]
impl EmailClient for LogEmailClient {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        info!(to = %message.to, subject = %message.subject, "email (log backend)");
        debug!("email body:\n{}", message.body);
        Ok(())
    }
}

/// Delivers via an HTTP transactional-mail API
pub struct HttpEmailClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from_address: String,
    from_name: Option<String>,
}

impl HttpEmailClient {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        from_address: String,
        from_name: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            endpoint,
            api_key,
            from_address,
            from_name,
        }
    }
}

#[async_trait]
impl EmailClient for HttpEmailClient {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let payload = serde_json::json!({
            "from": {
                "address": self.from_address,
                "name": self.from_name,
            },
            "to": message.to,
            "subject": message.subject,
            "text": message.body,
        });

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Upstream { status, body });
        }

        info!(to = %message.to, subject = %message.subject, "email delivered");
        Ok(())
    }
}

/// Storage key for a generated invoice
pub fn invoice_key(order_number: &str) -> String {
    format!("invoices/{}.txt", order_number)
}

/// Renders a plain-text invoice for an order. The snapshot columns on
/// the order items mean this stays correct no matter how the catalog
/// changes later.
pub fn render_invoice(
    order: &OrderModel,
    items: &[OrderItemModel],
    customer: &CustomerModel,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("INVOICE {}\n", order.order_number));
    out.push_str(&format!("Date: {}\n", order.created_at.format("%Y-%m-%d %H:%M UTC")));
    out.push_str(&format!(
        "Billed to: {} ({})\n",
        customer.pharmacy_name, customer.contact_name
    ));
    if let Some(address) = &order.delivery_address {
        out.push_str(&format!("Deliver to: {}\n", address));
    }
    out.push('\n');
    out.push_str(&format!(
        "{:<40} {:>8} {:>10} {:>12}\n",
        "Item", "Qty", "Unit", "Total"
    ));
    for item in items {
        out.push_str(&format!(
            "{:<40} {:>8} {:>10} {:>12}\n",
            item.product_name, item.quantity, item.unit_price, item.line_total
        ));
    }
    out.push('\n');
    out.push_str(&format!("{:>60} {:>12}\n", "Subtotal:", order.subtotal));
    out.push_str(&format!("{:>60} {:>12}\n", "Delivery:", order.delivery_fee));
    out.push_str(&format!("{:>60} {:>12}\n", "TOTAL:", order.total));
    out.push_str(&format!(
        "\nPayment: {}  Delivery: {}\n",
        order.payment_method, order.delivery_method
    ));
    out
}

/// Confirmation email sent right after placement
pub fn order_confirmation(order: &OrderModel, customer: &CustomerModel) -> EmailMessage {
    EmailMessage {
        to: customer.email.clone(),
        subject: format!("Order {} received", order.order_number),
        body: format!(
            "Hello {},\n\nwe received your order {} for a total of {}. \
             You will be notified as it moves through fulfilment.\n",
            customer.contact_name, order.order_number, order.total
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        CustomerStatus, DeliveryMethod, OrderStatus, PaymentMethod, PaymentStatus,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn fixture() -> (OrderModel, Vec<OrderItemModel>, CustomerModel) {
        let order_id = Uuid::new_v4();
        let customer_id = Uuid::new_v4();
        let order = OrderModel {
            id: order_id,
            order_number: "ORD-20250301-0001".into(),
            customer_id,
            status: OrderStatus::New,
            payment_status: PaymentStatus::Pending,
            delivery_method: DeliveryMethod::Pickup,
            payment_method: PaymentMethod::CashOnDelivery,
            subtotal: dec!(250.00),
            delivery_fee: dec!(0.00),
            total: dec!(250.00),
            delivery_address_id: None,
            delivery_address: None,
            delivery_fee_note: Some("pickup at store".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let items = vec![OrderItemModel {
            id: Uuid::new_v4(),
            order_id,
            product_id: Uuid::new_v4(),
            product_name: "Paracetamol 500mg".into(),
            generic_name: Some("Paracetamol".into()),
            sku: "MED-0001".into(),
            unit_price: dec!(100.00),
            quantity: 2,
            line_total: dec!(200.00),
            created_at: Utc::now(),
        }];
        let customer = CustomerModel {
            id: customer_id,
            email: "pharmacy@example.com".into(),
            password_hash: "irrelevant".into(),
            pharmacy_name: "Central Pharmacy".into(),
            contact_name: "Dana".into(),
            phone: "+123456".into(),
            license_number: None,
            status: CustomerStatus::Approved,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        (order, items, customer)
    }

    #[test]
    fn invoice_contains_lines_and_totals() {
        let (order, items, customer) = fixture();
        let invoice = render_invoice(&order, &items, &customer);
        assert!(invoice.contains("ORD-20250301-0001"));
        assert!(invoice.contains("Paracetamol 500mg"));
        assert!(invoice.contains("250.00"));
        assert!(invoice.contains("Central Pharmacy"));
    }

    #[test]
    fn confirmation_addresses_the_customer() {
        let (order, _, customer) = fixture();
        let message = order_confirmation(&order, &customer);
        assert_eq!(message.to, "pharmacy@example.com");
        assert!(message.subject.contains("ORD-20250301-0001"));
        assert!(message.body.contains("Dana"));
    }

    #[test]
    fn invoice_keys_are_stable() {
        assert_eq!(invoice_key("ORD-1"), "invoices/ORD-1.txt");
    }

    #[tokio::test]
    async fn log_backend_always_succeeds() {
        let client = LogEmailClient;
        let result = client
            .send(EmailMessage {
                to: "a@b.c".into(),
                subject: "s".into(),
                body: "b".into(),
            })
            .await;
        assert!(result.is_ok());
    }
}
