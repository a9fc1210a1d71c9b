//! Order fulfillment protocol constants.

/// Confirmation returned for a successfully placed order.
pub const PLACED_MESSAGE: &str = "Order placed successfully";

/// Operation label: place an order.
pub const OPERATION_PLACE: &str = "place";

/// Operation label: cancel an order.
pub const OPERATION_CANCEL: &str = "cancel";

/// Operation label: amend a line quantity.
pub const OPERATION_AMEND: &str = "amend";
