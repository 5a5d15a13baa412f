use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PharmaHub API",
        version = "0.3.0",
        description = r#"
# PharmaHub Wholesale Pharmacy API

Backend for a B2B wholesale pharmacy: verified pharmacies browse the
catalog, build a cart, and place orders; staff manage the catalog,
customer verification, stock, and order fulfilment.

## Authentication

Customers and admins authenticate separately. Tokens are issued on
login and accepted either as an HttpOnly session cookie or as a bearer
header:

```
Authorization: Bearer <your-jwt-token>
```

A customer token is never valid on `/api/v1/admin` routes and vice
versa.

## Error Handling

Errors use a single envelope with appropriate HTTP status codes:

```json
{
  "error": "Not Found",
  "message": "Product not found",
  "details": null,
  "request_id": "0191c9c8-..."
}
```

## Pagination

List endpoints accept `page` and `per_page` query parameters and
respond with `items`, `total`, `page`, and `per_page`.
        "#
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Customer registration and sessions"),
        (name = "Catalog", description = "Product, category and manufacturer browsing"),
        (name = "Cart", description = "Cart management"),
        (name = "Orders", description = "Checkout and order tracking"),
        (name = "Admin", description = "Verification, catalog, stock, and fulfilment management"),
        (name = "Reports", description = "Sales and inventory reporting"),
        (name = "Health", description = "Health check endpoints")
    ),
    components(
        schemas(
            // Auth and customers
            crate::services::customers::RegisterCustomerInput,
            crate::services::customers::LoginInput,
            crate::services::customers::UpdateProfileInput,
            crate::services::customers::CustomerResponse,
            crate::services::customers::AdminResponse,
            crate::services::customers::SetActiveInput,

            // Catalog
            crate::services::catalog::ProductResponse,
            crate::services::catalog::CreateProductInput,
            crate::services::catalog::UpdateProductInput,
            crate::services::catalog::BulkPriceUpdateInput,
            crate::services::catalog::PriceUpdate,
            crate::services::catalog::BulkPriceOutcome,
            crate::services::catalog::BulkPriceFailure,
            crate::services::catalog::CategoryInput,
            crate::services::catalog::ManufacturerInput,

            // Cart
            crate::services::cart::AddCartItemInput,
            crate::services::cart::UpdateCartItemInput,
            crate::services::cart::CartLine,
            crate::services::cart::CartWarning,
            crate::services::cart::CartView,

            // Addresses and delivery
            crate::services::addresses::CreateAddressInput,
            crate::services::addresses::UpdateAddressInput,
            crate::services::addresses::AddressResponse,
            crate::services::delivery::DeliveryQuote,

            // Orders
            crate::services::orders::PlaceOrderInput,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderItemResponse,
            crate::services::orders::OrderHistoryEntry,
            crate::services::orders::OrderDetail,
            crate::services::order_status::UpdateOrderStatusInput,

            // Inventory
            crate::services::inventory::AdjustStockInput,
            crate::services::inventory::StockAdjustment,
            crate::services::inventory::StockMovementResponse,

            // Imports and uploads
            crate::services::imports::ImportOutcome,
            crate::services::imports::ImportRowError,
            crate::services::uploads::UploadedImage,

            // Reports
            crate::services::reports::SalesReport,
            crate::services::reports::StatusCount,
            crate::services::reports::TopProduct,
            crate::services::reports::InventoryReport,
            crate::services::reports::LowStockProduct,

            // Settings
            crate::services::settings::UpdateStoreSettingsInput,

            // Error types
            crate::errors::ErrorResponse,
            crate::errors::StockShortage
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_renders() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("PharmaHub API"));
        assert!(json.contains("ErrorResponse"));
    }
}
