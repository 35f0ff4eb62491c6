//! # Printer Seam
//!
//! Receipt printing abstracted behind a trait so the engine does not depend
//! on any physical device. The engine calls the printer strictly after a
//! transaction commits; a printing failure can never undo a sale, so the
//! trait methods are infallible from the caller's point of view.

use comptoir_core::{Cart, JournalLine, Money, Payment};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One printable line of a ticket or bill.
///
/// Carries names and prices by value so printing never needs a database
/// lookup (and so it works for journal snapshots whose products may have
/// been edited since).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<&JournalLine> for ReceiptLine {
    fn from(line: &JournalLine) -> Self {
        ReceiptLine {
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
            subtotal_cents: line.subtotal_cents,
        }
    }
}

/// Abstraction over receipt output.
///
/// Implementations render a kitchen ticket when a cart is opened and a
/// client bill when it is paid. Both calls are fire-and-forget from the
/// engine's point of view.
pub trait Printer: Send + Sync {
    /// Prints the kitchen ticket for a freshly created cart.
    fn print_kitchen_ticket(&self, cart: &Cart, lines: &[ReceiptLine]);

    /// Prints the client bill after a successful payment.
    fn print_client_bill(&self, payment: &Payment, lines: &[ReceiptLine]);
}

/// Printer that writes receipts to the structured log.
///
/// The default implementation for deployments without a physical printer,
/// and a readable trace of every ticket in development.
#[derive(Debug, Default, Clone)]
pub struct LogPrinter;

impl Printer for LogPrinter {
    fn print_kitchen_ticket(&self, cart: &Cart, lines: &[ReceiptLine]) {
        info!(
            cart_id = %cart.id,
            table = cart.table_number,
            "kitchen ticket"
        );
        for line in lines {
            info!(
                "  {} x{} @ {}",
                line.product_name,
                line.quantity,
                Money::from_cents(line.unit_price_cents)
            );
        }
    }

    fn print_client_bill(&self, payment: &Payment, lines: &[ReceiptLine]) {
        info!(
            payment_id = %payment.id,
            table = payment.table_number,
            due = %Money::from_cents(payment.amount_due_cents),
            received = %Money::from_cents(payment.cash_received_cents),
            change = %Money::from_cents(payment.change_cents),
            "client bill"
        );
        for line in lines {
            info!(
                "  {} x{} = {}",
                line.product_name,
                line.quantity,
                Money::from_cents(line.subtotal_cents)
            );
        }
    }
}
