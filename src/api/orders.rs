use super::{ApiClient, ApiError};
use crate::models::{NewOrder, Order, OrderReceipt};

impl ApiClient {
    pub async fn create_order(&self, order: &NewOrder) -> Result<OrderReceipt, ApiError> {
        let request = self.http().post(self.url(&["orders", "create"])?).json(order);
        self.fetch(request, "Failed to create order").await
    }

    pub async fn order_history(&self) -> Result<Vec<Order>, ApiError> {
        let request = self.http().get(self.url(&["orders", "history"])?);
        self.fetch(request, "Failed to fetch orders").await
    }

    pub async fn get_order(&self, id: &str) -> Result<Order, ApiError> {
        let request = self.http().get(self.url(&["orders", "detail", id])?);
        self.fetch(request, "Failed to fetch order").await
    }

    pub async fn cancel_order(&self, id: &str) -> Result<(), ApiError> {
        let request = self.http().patch(self.url(&["orders", "cancel", id])?);
        self.submit(request, "Failed to cancel order").await
    }
}
