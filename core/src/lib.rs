//! Client core for the personal-finance REST API.
//!
//! # Overview
//! `FinanceClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network. `ApiClient` pairs it with a
//! `Transport` and a `Storage` to run real calls with the persisted bearer
//! token attached. `SessionStore` owns the authentication lifecycle on top
//! of an `ApiClient`, and `DemoFallback` wraps a transport to detect an
//! unreachable backend so views can fall back to `sample` data.
//!
//! # Design
//! - Nothing is global: the store, client, storage and demo flag are built
//!   by the caller and passed where they are needed.
//! - Each operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and the core is testable without a server.
//! - Forms are typed and validated before a request is built; invalid input
//!   never reaches the network.
//! - No retries, no caching. Every failure is scoped to the call that
//!   triggered it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use finance_core::{
//!     ApiClient, ClientConfig, DemoFallback, FileStorage, FinanceClient, SessionStore,
//!     UreqTransport, Wallet,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FinanceClient::new(ClientConfig::from_env());
//! let transport = DemoFallback::new(UreqTransport::new(), client.build_health_check());
//! transport.check_backend_health();
//! let storage = Arc::new(FileStorage::open_default()?);
//!
//! let mut session = SessionStore::new(ApiClient::new(client, transport, storage));
//! session.restore()?;
//! let wallets = finance_core::or_sample(
//!     session.api().list::<Wallet>(),
//!     finance_core::sample::wallets,
//! )?;
//! # let _ = wallets;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod demo;
pub mod error;
pub mod forms;
pub mod http;
pub mod sample;
pub mod session;
pub mod storage;
pub mod summary;
pub mod transport;
pub mod types;

pub use api::ApiClient;
pub use client::FinanceClient;
pub use config::ClientConfig;
pub use demo::{or_sample, DemoFallback, DemoMode};
pub use error::{ApiError, TransportError, ValidationError};
pub use forms::{
    AvatarUpload, BudgetUpdate, ChangePasswordForm, ForgotPasswordForm, GoalUpdate,
    InvestmentUpdate, LoginForm, NewBudget, NewGoal, NewInvestment, NewTransaction, NewWallet,
    PasswordResetForm, ProfileUpdate, RegisterForm, TransactionUpdate, Validate, WalletUpdate,
};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{Session, SessionStore};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use transport::{Transport, UreqTransport};
pub use types::{
    AuthResponse, Budget, BudgetPeriod, Goal, Investment, Resource, Transaction, TransactionKind,
    User, Wallet,
};
