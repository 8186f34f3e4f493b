//! Order notifications.
//!
//! Each [`OrderEvent`] renders into at most one email per audience. The
//! [`Dispatcher`] sends those emails and never fails: state changes that
//! triggered a notification stay committed whatever happens to the mail.

use askama::Template;
use rust_decimal::Decimal;

use hoi_core::{OrderStatus, PaymentStatus};

use super::email::{EmailError, Notifier, RenderedEmail};
use crate::models::{Order, OrderItem};

/// Something that happened to an order and may be worth an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    Placed,
    StatusChanged(OrderStatus),
    CancellationRequested,
    PaymentSucceeded,
}

impl OrderEvent {
    /// Upper-case event label used in customer subjects.
    fn label(self) -> String {
        match self {
            Self::Placed => "PLACED".to_string(),
            Self::StatusChanged(status) => status.label(),
            Self::CancellationRequested => "CANCEL REQUESTED".to_string(),
            Self::PaymentSucceeded => "PAYMENT SUCCESS".to_string(),
        }
    }
}

/// Who an email is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Customer,
    Admin,
}

struct Cta {
    label: &'static str,
    url: String,
}

struct CustomerView {
    name: String,
    email: String,
    phone: String,
    address_lines: Vec<String>,
    address_type: &'static str,
}

struct ItemView {
    name: String,
    size: String,
    color: String,
    quantity: i32,
    sale_price: String,
    mrp: Option<String>,
    line_total: String,
}

/// Precomputed strings for the order email templates.
struct OrderEmailView {
    preheader: String,
    heading: String,
    greeting: Option<String>,
    paragraphs: Vec<String>,
    cancel_reason: Option<String>,
    cancel_note: Option<String>,
    customer: Option<CustomerView>,
    items: Vec<ItemView>,
    order_number: String,
    grand_total: String,
    items_total: String,
    discount: Option<String>,
    shipping: String,
    payment: String,
    cta: Option<Cta>,
    care_note: bool,
}

#[derive(Template)]
#[template(path = "email/order_event.html")]
struct OrderEventHtml<'a> {
    view: &'a OrderEmailView,
}

#[derive(Template)]
#[template(path = "email/order_event.txt")]
struct OrderEventText<'a> {
    view: &'a OrderEmailView,
}

/// Copy that differs between events.
struct EmailCopy {
    subject: String,
    preheader: &'static str,
    heading: String,
    paragraphs: Vec<String>,
    cta: Option<Cta>,
}

fn rupees(amount: Decimal) -> String {
    format!("₹{:.2}", amount.round_dp(2))
}

fn order_view(order: &Order, audience: Audience, copy: EmailCopy) -> OrderEmailView {
    let totals = &order.totals;
    let is_customer = audience == Audience::Customer;
    let show_cancel = matches!(audience, Audience::Admin) || order.cancel_requested;

    OrderEmailView {
        preheader: copy.preheader.to_string(),
        heading: copy.heading,
        greeting: is_customer.then(|| order.recipient_name().to_string()),
        paragraphs: copy.paragraphs,
        cancel_reason: order.cancel_reason.clone().filter(|_| show_cancel),
        cancel_note: order.cancel_reason_note.clone().filter(|_| show_cancel),
        customer: (!is_customer).then(|| customer_view(order)),
        items: order.items.iter().map(item_view).collect(),
        order_number: order.order_number.clone(),
        grand_total: rupees(totals.grand_total),
        items_total: rupees(totals.items_total),
        discount: (totals.discount_total > Decimal::ZERO).then(|| rupees(totals.discount_total)),
        shipping: if totals.shipping_fee.is_zero() {
            "FREE".to_string()
        } else {
            rupees(totals.shipping_fee)
        },
        payment: format!("{} / {}", order.payment_method, order.payment_status),
        cta: copy.cta,
        care_note: is_customer,
    }
}

fn customer_view(order: &Order) -> CustomerView {
    let a = &order.shipping_address;
    let customer = order.customer.as_ref();

    let mut address_lines = vec![a.address_line1.clone()];
    address_lines.extend(a.address_line2.clone());
    address_lines.push(format!("{}, {} - {}", a.city, a.state, a.pincode));
    address_lines.extend(a.landmark.as_ref().map(|l| format!("Landmark: {l}")));

    CustomerView {
        name: order.recipient_name().to_string(),
        email: order.customer_email().unwrap_or("-").to_string(),
        phone: if a.phone.trim().is_empty() {
            customer.map_or_else(|| "-".to_string(), |c| c.phone.clone())
        } else {
            a.phone.clone()
        },
        address_lines,
        address_type: a.address_type.as_str(),
    }
}

fn item_view(item: &OrderItem) -> ItemView {
    ItemView {
        name: item.name.clone(),
        size: item.size.clone().unwrap_or_else(|| "-".to_string()),
        color: item.color.clone().unwrap_or_else(|| "-".to_string()),
        quantity: item.quantity,
        sale_price: rupees(item.sale_price),
        mrp: (item.mrp != item.sale_price).then(|| rupees(item.mrp)),
        line_total: rupees(item.line_total),
    }
}

fn customer_copy(order: &Order, event: OrderEvent, frontend_url: &str) -> Option<EmailCopy> {
    let orders_url = format!("{frontend_url}/account/orders");
    let orders_cta = |label| {
        Some(Cta {
            label,
            url: orders_url.clone(),
        })
    };

    let (preheader, heading, paragraphs, cta): (&'static str, &str, Vec<String>, Option<Cta>) =
        match event {
        OrderEvent::Placed => (
            "Your HOI order has been placed successfully.",
            "Your order is placed",
            vec![
                "Thank you for choosing House of Intimacy. We have received your order and our team is already on it.".to_string(),
                "You will get updates at every important step, from confirmation to shipping to delivery.".to_string(),
            ],
            orders_cta("Track / View Your Order"),
        ),
        OrderEvent::StatusChanged(OrderStatus::Placed) => return None,
        OrderEvent::StatusChanged(OrderStatus::Confirmed) => (
            "Your HOI order is confirmed.",
            "Order confirmed",
            vec![
                "Great news! Your order has been confirmed and is moving into our packing studio.".to_string(),
                "You will receive another update when your parcel has been shipped.".to_string(),
            ],
            orders_cta("View Order Details"),
        ),
        OrderEvent::StatusChanged(OrderStatus::Processing) => (
            "Your HOI order is being processed.",
            "We're preparing your package",
            vec![
                "Your order is now being packed. Each piece is checked for quality, comfort and finish before it leaves us.".to_string(),
                "As soon as it is shipped, we will send you another update.".to_string(),
            ],
            None,
        ),
        OrderEvent::StatusChanged(OrderStatus::Shipped) => (
            "Your HOI order has been shipped.",
            "Your order is on the way",
            vec![
                "Your HOI parcel has been shipped and is now with our delivery partner.".to_string(),
                "You can check the latest status anytime from your account.".to_string(),
            ],
            orders_cta("Track Live Status"),
        ),
        OrderEvent::StatusChanged(OrderStatus::OutForDelivery) => (
            "Your HOI order is out for delivery.",
            "Out for delivery",
            vec![
                "Your HOI order is out for delivery and should reach you today. Please keep your phone reachable and, for COD orders, the amount handy.".to_string(),
            ],
            orders_cta("View Delivery Details"),
        ),
        OrderEvent::StatusChanged(OrderStatus::Delivered) => (
            "Your HOI order has been delivered.",
            "Delivered",
            vec![
                "Your order has been delivered. We hope your new favourites make you feel confident and comfortable.".to_string(),
                "If something doesn't feel right with your order, just reach out and we'll be happy to help.".to_string(),
            ],
            Some(Cta {
                label: "Explore More Styles",
                url: format!("{frontend_url}/shop"),
            }),
        ),
        OrderEvent::StatusChanged(OrderStatus::Cancelled) => (
            "Your HOI order has been cancelled.",
            "Order cancelled",
            vec![
                if order.payment_status == PaymentStatus::Refunded {
                    "Your order has been cancelled. Any eligible amount will be refunded as per our refund policy.".to_string()
                } else {
                    "Your order has been cancelled. If you paid online and are eligible for a refund, it will be processed as per our policy.".to_string()
                },
                "If this was not requested by you, or if you have any questions, please contact our support team.".to_string(),
            ],
            None,
        ),
        OrderEvent::CancellationRequested => (
            "We received your cancellation request.",
            "We received your cancellation request",
            vec![
                "Our team will review your request and update you shortly. You will get another email once it is processed.".to_string(),
            ],
            orders_cta("View Order"),
        ),
        OrderEvent::PaymentSucceeded => (
            "Your HOI payment was successful.",
            "Payment received",
            vec![
                "We have successfully received your payment. Your items will now move into confirmation and processing.".to_string(),
            ],
            orders_cta("View Order"),
        ),
    };

    let subject = match event {
        OrderEvent::CancellationRequested => {
            format!("We received your cancellation request – {}", order.order_number)
        }
        _ => format!("HOI – Order {} ({})", event.label(), order.order_number),
    };

    Some(EmailCopy {
        subject,
        preheader,
        heading: heading.to_string(),
        paragraphs,
        cta,
    })
}

fn admin_copy(order: &Order, event: OrderEvent, frontend_url: &str) -> Option<EmailCopy> {
    let dashboard = Some(Cta {
        label: "Open Admin Dashboard",
        url: format!("{frontend_url}/admin/placed-orders"),
    });

    match event {
        OrderEvent::Placed => Some(EmailCopy {
            subject: format!("New Order – {}", order.order_number),
            preheader: "New HOI order received.",
            heading: "New order received".to_string(),
            paragraphs: vec![
                "A new order has been placed on House of Intimacy. Please review and process it from your admin panel.".to_string(),
            ],
            cta: dashboard,
        }),
        OrderEvent::StatusChanged(OrderStatus::Placed) | OrderEvent::PaymentSucceeded => None,
        OrderEvent::StatusChanged(status) => Some(EmailCopy {
            subject: format!("HOI – Order {} ({})", status.label(), order.order_number),
            preheader: "An HOI order changed status.",
            heading: format!("Order {}", status.label()),
            paragraphs: vec![format!(
                "Order {} is now {}. Payment status: {}.",
                order.order_number,
                status.label(),
                order.payment_status
            )],
            cta: dashboard,
        }),
        OrderEvent::CancellationRequested => Some(EmailCopy {
            subject: format!("Cancellation request: {}", order.order_number),
            preheader: "A customer asked to cancel an order.",
            heading: "Cancellation request".to_string(),
            paragraphs: vec![format!(
                "A customer has asked to cancel order {}. Review it from the admin panel.",
                order.order_number
            )],
            cta: dashboard,
        }),
    }
}

/// Render the email for `event` as seen by `audience`.
///
/// Returns `Ok(None)` when no email exists for that combination.
///
/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn render(
    order: &Order,
    event: OrderEvent,
    audience: Audience,
    frontend_url: &str,
) -> Result<Option<RenderedEmail>, EmailError> {
    let copy = match audience {
        Audience::Customer => customer_copy(order, event, frontend_url),
        Audience::Admin => admin_copy(order, event, frontend_url),
    };
    let Some(copy) = copy else {
        return Ok(None);
    };

    let subject = copy.subject.clone();
    let view = order_view(order, audience, copy);
    Ok(Some(RenderedEmail {
        subject,
        text: OrderEventText { view: &view }.render()?,
        html: OrderEventHtml { view: &view }.render()?,
    }))
}

/// Sends order emails to the customer and the shop owners.
#[derive(Clone, Copy)]
pub struct Dispatcher<'a> {
    notifier: &'a dyn Notifier,
    admin_emails: &'a [String],
    frontend_url: &'a str,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub const fn new(
        notifier: &'a dyn Notifier,
        admin_emails: &'a [String],
        frontend_url: &'a str,
    ) -> Self {
        Self {
            notifier,
            admin_emails,
            frontend_url,
        }
    }

    /// Notify every audience of `event`. Failures are logged, never returned.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, order_number = %order.order_number))]
    pub async fn order_event(&self, order: &Order, event: OrderEvent) {
        self.to_customer(order, event).await;
        self.to_admins(order, event).await;
    }

    async fn to_customer(&self, order: &Order, event: OrderEvent) {
        let Some(to) = order.customer_email() else {
            tracing::debug!(?event, "No customer email on order, skipping customer email");
            return;
        };
        let Some(email) = self.render_for(order, event, Audience::Customer) else {
            return;
        };
        if let Err(e) = self.notifier.send(to, &email).await {
            tracing::error!(?event, error = %e, "Failed to send customer order email");
        }
    }

    async fn to_admins(&self, order: &Order, event: OrderEvent) {
        let Some(email) = self.render_for(order, event, Audience::Admin) else {
            return;
        };
        if self.admin_emails.is_empty() {
            tracing::warn!(?event, "ADMIN_EMAILS not configured, skipping owner email");
            return;
        }
        for to in self.admin_emails {
            if let Err(e) = self.notifier.send(to, &email).await {
                tracing::error!(?event, to = %to, error = %e, "Failed to send owner order email");
            }
        }
    }

    fn render_for(&self, order: &Order, event: OrderEvent, audience: Audience) -> Option<RenderedEmail> {
        match render(order, event, audience, self.frontend_url) {
            Ok(Some(email)) => Some(email),
            Ok(None) => {
                tracing::info!(?event, ?audience, "No email template for event, skipping");
                None
            }
            Err(e) => {
                tracing::error!(?event, ?audience, error = %e, "Failed to render order email");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{RecordingNotifier, sample_order};

    const FRONTEND: &str = "https://hoi.in";

    #[test]
    fn test_placed_subjects() {
        let order = sample_order();
        let customer = render(&order, OrderEvent::Placed, Audience::Customer, FRONTEND)
            .unwrap()
            .unwrap();
        assert_eq!(
            customer.subject,
            format!("HOI – Order PLACED ({})", order.order_number)
        );
        assert!(customer.html.contains("https://hoi.in/account/orders"));

        let admin = render(&order, OrderEvent::Placed, Audience::Admin, FRONTEND)
            .unwrap()
            .unwrap();
        assert_eq!(admin.subject, format!("New Order – {}", order.order_number));
        assert!(admin.text.contains("Customer: "));
    }

    #[test]
    fn test_status_subject_uses_spaced_label() {
        let order = sample_order();
        let email = render(
            &order,
            OrderEvent::StatusChanged(OrderStatus::OutForDelivery),
            Audience::Customer,
            FRONTEND,
        )
        .unwrap()
        .unwrap();
        assert!(email.subject.contains("OUT FOR DELIVERY"));
    }

    #[test]
    fn test_status_placed_has_no_template() {
        let order = sample_order();
        for audience in [Audience::Customer, Audience::Admin] {
            let email = render(
                &order,
                OrderEvent::StatusChanged(OrderStatus::Placed),
                audience,
                FRONTEND,
            )
            .unwrap();
            assert!(email.is_none());
        }
    }

    #[test]
    fn test_free_shipping_rendered() {
        let mut order = sample_order();
        order.totals.shipping_fee = Decimal::ZERO;
        let email = render(&order, OrderEvent::Placed, Audience::Customer, FRONTEND)
            .unwrap()
            .unwrap();
        assert!(email.text.contains("Shipping: FREE"));
    }

    #[test]
    fn test_cancellation_request_shows_reason_to_admin() {
        let mut order = sample_order();
        order.cancel_requested = true;
        order.cancel_reason = Some("ORDERED_BY_MISTAKE".to_string());
        let email = render(
            &order,
            OrderEvent::CancellationRequested,
            Audience::Admin,
            FRONTEND,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            email.subject,
            format!("Cancellation request: {}", order.order_number)
        );
        assert!(email.text.contains("Reason: ORDERED_BY_MISTAKE"));
    }

    #[tokio::test]
    async fn test_dispatch_reaches_customer_and_each_admin() {
        let notifier = RecordingNotifier::default();
        let admins = vec!["owner@hoi.in".to_string(), "ops@hoi.in".to_string()];
        let dispatcher = Dispatcher::new(&notifier, &admins, FRONTEND);

        dispatcher
            .order_event(&sample_order(), OrderEvent::Placed)
            .await;

        let sent = notifier.recipients();
        assert_eq!(sent, vec!["asha@example.in", "owner@hoi.in", "ops@hoi.in"]);
    }

    #[tokio::test]
    async fn test_dispatch_skips_missing_customer_and_empty_admins() {
        let notifier = RecordingNotifier::default();
        let dispatcher = Dispatcher::new(&notifier, &[], FRONTEND);

        let mut order = sample_order();
        order.customer = None;
        dispatcher.order_event(&order, OrderEvent::Placed).await;

        assert!(notifier.recipients().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_swallows_send_failures() {
        let notifier = RecordingNotifier::failing();
        let admins = vec!["owner@hoi.in".to_string()];
        let dispatcher = Dispatcher::new(&notifier, &admins, FRONTEND);

        dispatcher
            .order_event(&sample_order(), OrderEvent::PaymentSucceeded)
            .await;

        assert_eq!(notifier.attempts(), 1);
    }
}
