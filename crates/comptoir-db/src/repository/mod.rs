//! # Repository Module
//!
//! Database repository implementations for Comptoir POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Engine workflow                                                    │
//! │       │                                                             │
//! │       │  db.carts().insert(&mut tx, &cart)                          │
//! │       ▼                                                             │
//! │  CartRepository ── SQL isolated in one place                        │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database                                                    │
//! │                                                                     │
//! │  Pool-bound methods: single-statement reads                         │
//! │  Conn-bound methods: mutations and in-transaction reads, composed   │
//! │  by the engine into one unit of work                                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD and guarded stock updates
//! - [`cart::CartRepository`] - Cart and cart-line operations
//! - [`payment::PaymentRepository`] - Payment records
//! - [`journal::JournalRepository`] - Immutable finalized-cart snapshots
//! - [`stock_history::StockHistoryRepository`] - Append-only stock audit

pub mod cart;
pub mod journal;
pub mod payment;
pub mod product;
pub mod stock_history;
