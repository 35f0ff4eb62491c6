//! # comptoir-db: Database Layer for Comptoir POS
//!
//! SQLite storage for the POS, using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Comptoir POS Data Flow                           │
//! │                                                                     │
//! │  comptoir-engine (cart lifecycle / checkout)                        │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                  comptoir-db (THIS CRATE)                     │  │
//! │  │                                                               │  │
//! │  │   ┌────────────┐   ┌────────────────┐   ┌────────────────┐   │  │
//! │  │   │  Database  │   │  Repositories  │   │   Migrations   │   │  │
//! │  │   │ (pool.rs)  │◄──│ product, cart, │   │   (embedded)   │   │  │
//! │  │   │ SqlitePool │   │ payment, ...   │   │ 001_init.sql   │   │  │
//! │  │   └────────────┘   └────────────────┘   └────────────────┘   │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (WAL mode)                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Transaction Convention
//!
//! Methods that participate in multi-statement units of work take a
//! `&mut SqliteConnection`; the caller owns the transaction:
//!
//! ```rust,ignore
//! let mut tx = db.begin().await?;
//! db.carts().insert(&mut tx, &cart).await?;
//! db.carts().insert_line(&mut tx, &line).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::cart::CartRepository;
pub use repository::journal::JournalRepository;
pub use repository::payment::PaymentRepository;
pub use repository::product::ProductRepository;
pub use repository::stock_history::StockHistoryRepository;
