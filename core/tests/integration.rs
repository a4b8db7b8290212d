//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the session store and
//! the API client over real HTTP with `UreqTransport`. Validates that request
//! building, token injection and response parsing agree with the server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use finance_core::storage::{TOKEN_KEY, USER_KEY};
use finance_core::{
    or_sample, sample, ApiClient, ApiError, Budget, BudgetPeriod, ChangePasswordForm, ClientConfig,
    DemoFallback, FileStorage, FinanceClient, Goal, GoalUpdate, Investment, MemoryStorage, NewBudget,
    NewGoal, NewInvestment, NewTransaction, NewWallet, PasswordResetForm, ProfileUpdate,
    RegisterForm, SessionStore, Storage, Transaction, TransactionKind, UreqTransport, Wallet,
    WalletUpdate,
};
use mock_server::Db;

/// Run the mock server on its own thread and return its address.
fn start_server() -> (SocketAddr, Db) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let db = Db::default();
    let server_db = db.clone();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::serve(listener, server_db).await
        })
        .unwrap();
    });

    (addr, db)
}

fn session_for(
    config: ClientConfig,
    storage: Arc<dyn Storage>,
) -> SessionStore<DemoFallback<UreqTransport>> {
    let client = FinanceClient::new(config);
    let transport = DemoFallback::new(UreqTransport::new(), client.build_health_check());
    SessionStore::new(ApiClient::new(client, transport, storage))
}

fn config_for(addr: SocketAddr) -> ClientConfig {
    ClientConfig::new(&format!("http://{addr}"))
}

#[test]
fn register_then_crud_every_resource() {
    let (addr, _db) = start_server();
    let storage = Arc::new(MemoryStorage::new());
    let mut session = session_for(config_for(addr), storage.clone());

    // Step 1: register.
    let user = session
        .register(&RegisterForm::new("A", "a@b.com", "123456"))
        .unwrap();
    assert_eq!(session.user().unwrap().id, user.id);
    let token = session.token().unwrap().to_string();
    assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some(token.as_str()));
    assert!(storage.get(USER_KEY).unwrap().is_some());

    let api = session.api();

    // Step 2: wallets.
    assert!(api.list::<Wallet>().unwrap().is_empty());
    let wallet = api
        .create::<Wallet>(&NewWallet {
            name: "Checking".to_string(),
            balance: 100.0,
            currency: "USD".to_string(),
            kind: Some("bank".to_string()),
        })
        .unwrap();
    assert_eq!(wallet.kind.as_deref(), Some("bank"));
    let updated = api
        .update::<Wallet>(
            wallet.id,
            &WalletUpdate {
                balance: Some(150.0),
                ..WalletUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.balance, 150.0);
    assert_eq!(updated.name, "Checking");
    assert_eq!(api.get::<Wallet>(wallet.id).unwrap(), updated);

    // Step 3: the other collections.
    let budget = api
        .create::<Budget>(&NewBudget {
            name: "Food".to_string(),
            category: "Groceries".to_string(),
            amount: 400.0,
            period: BudgetPeriod::Weekly,
            ..NewBudget::default()
        })
        .unwrap();
    assert_eq!(budget.period, BudgetPeriod::Weekly);

    let goal = api
        .create::<Goal>(&NewGoal {
            name: "Bike".to_string(),
            target_amount: 900.0,
            current_amount: 0.0,
            deadline: NaiveDate::from_ymd_opt(2025, 5, 1),
        })
        .unwrap();
    let goal = api
        .update::<Goal>(
            goal.id,
            &GoalUpdate {
                current_amount: Some(450.0),
                ..GoalUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(goal.progress(), 50.0);

    api.create::<Investment>(&NewInvestment {
        name: "Index".to_string(),
        kind: "etf".to_string(),
        amount_invested: 1000.0,
        current_value: 1100.0,
        currency: "USD".to_string(),
    })
    .unwrap();

    let tx = api
        .create::<Transaction>(&NewTransaction {
            wallet_id: Some(wallet.id),
            amount: 25.0,
            kind: TransactionKind::Expense,
            category: "Food".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            description: None,
        })
        .unwrap();
    assert_eq!(tx.wallet_id, Some(wallet.id));

    assert_eq!(api.list::<Budget>().unwrap().len(), 1);
    assert_eq!(api.list::<Investment>().unwrap().len(), 1);
    assert_eq!(api.list::<Transaction>().unwrap().len(), 1);

    // Step 4: delete, then 404 on the next read.
    api.delete::<Wallet>(wallet.id).unwrap();
    assert!(matches!(api.get::<Wallet>(wallet.id), Err(ApiError::NotFound)));
    assert!(matches!(api.delete::<Wallet>(wallet.id), Err(ApiError::NotFound)));

    // Step 5: logout drops the token, so the server refuses the next call.
    session.logout().unwrap();
    assert!(storage.get(TOKEN_KEY).unwrap().is_none());
    let err = session.api().list::<Goal>().unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 401, .. }));
    assert_eq!(err.to_string(), "Unauthorized");
}

#[test]
fn login_with_bad_password_records_server_message() {
    let (addr, _db) = start_server();
    let mut session = session_for(config_for(addr), Arc::new(MemoryStorage::new()));
    session
        .register(&RegisterForm::new("A", "a@b.com", "123456"))
        .unwrap();
    session.logout().unwrap();

    let err = session.login("a@b.com", "wrong-password").unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 401, .. }));
    assert!(session.error().unwrap().contains("Invalid credentials"));
    assert!(!session.is_loading());
    assert!(session.user().is_none());

    let user = session.login("a@b.com", "123456").unwrap();
    assert_eq!(user.email, "a@b.com");
    assert!(session.error().is_none());
}

#[test]
fn session_survives_restart_through_file_storage() {
    let (addr, _db) = start_server();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let mut first = session_for(config_for(addr), Arc::new(FileStorage::open(&path).unwrap()));
    first
        .register(&RegisterForm::new("A", "a@b.com", "123456"))
        .unwrap();
    let token = first.token().unwrap().to_string();
    drop(first);

    // Strict restore: one /auth/me round trip.
    let mut strict = session_for(config_for(addr), Arc::new(FileStorage::open(&path).unwrap()));
    assert!(strict.restore().unwrap());
    assert_eq!(strict.token(), Some(token.as_str()));
    assert_eq!(strict.user().unwrap().name, "A");

    // Profile edits are persisted for the next start.
    strict
        .update_profile(&ProfileUpdate {
            currency: Some("EUR".to_string()),
            ..ProfileUpdate::default()
        })
        .unwrap();
    drop(strict);

    let mut cached = session_for(
        config_for(addr).with_revalidation(false),
        Arc::new(FileStorage::open(&path).unwrap()),
    );
    assert!(cached.restore().unwrap());
    assert_eq!(cached.user().unwrap().currency.as_deref(), Some("EUR"));
}

#[test]
fn revoked_token_is_cleared_on_check_auth() {
    let (addr, _db) = start_server();
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    storage.set(TOKEN_KEY, "not-a-real-token").unwrap();
    storage.set(USER_KEY, r#"{"id":99,"name":"Ghost"}"#).unwrap();

    let mut session = session_for(config_for(addr), storage.clone());
    assert!(!session.check_auth().unwrap());
    assert!(!session.is_authenticated());
    assert!(storage.get(TOKEN_KEY).unwrap().is_none());
    assert!(storage.get(USER_KEY).unwrap().is_none());
}

#[test]
fn password_maintenance_round_trips() {
    let (addr, db) = start_server();
    let mut session = session_for(config_for(addr), Arc::new(MemoryStorage::new()));
    session
        .register(&RegisterForm::new("A", "a@b.com", "123456"))
        .unwrap();

    session
        .change_password(&ChangePasswordForm {
            current_password: "123456".to_string(),
            new_password: "abcdef".to_string(),
            new_password_confirmation: "abcdef".to_string(),
        })
        .unwrap();

    let err = session
        .change_password(&ChangePasswordForm {
            current_password: "123456".to_string(),
            new_password: "ghijkl".to_string(),
            new_password_confirmation: "ghijkl".to_string(),
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "Current password is incorrect");

    session.logout().unwrap();
    session.reset_password("a@b.com").unwrap();
    let token = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(mock_server::reset_token_for(&db, "a@b.com"))
        .unwrap();
    session
        .confirm_password_reset(&PasswordResetForm {
            token,
            password: "reset-pass".to_string(),
            password_confirmation: "reset-pass".to_string(),
        })
        .unwrap();
    session.login("a@b.com", "reset-pass").unwrap();

    session.delete_account().unwrap();
    assert!(!session.is_authenticated());
    assert!(session.login("a@b.com", "reset-pass").is_err());
}

#[test]
fn unreachable_backend_enters_demo_mode() {
    // Bind then drop, so the port refuses connections.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let mut session = session_for(config_for(addr), Arc::new(MemoryStorage::new()));

    let started = Instant::now();
    let err = session.login("a@b.com", "123456").unwrap_err();
    assert!(err.is_backend_unavailable());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(session.api().transport().is_in_demo_mode());

    let wallets = or_sample(session.api().list::<Wallet>(), sample::wallets).unwrap();
    assert_eq!(wallets, sample::wallets());
}

#[test]
fn silent_backend_times_out() {
    // Accepts connections into the backlog but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let config = config_for(addr)
        .with_request_timeout(Duration::from_millis(300))
        .with_health_timeout(Duration::from_millis(200));
    let session = session_for(config, Arc::new(MemoryStorage::new()));
    let transport = session.api().transport();

    let started = Instant::now();
    assert!(!transport.check_backend_health());
    assert!(transport.is_in_demo_mode());

    let err = session.api().list::<Budget>().unwrap_err();
    assert!(err.is_backend_unavailable());
    assert!(started.elapsed() < Duration::from_secs(5));
    drop(listener);
}

#[test]
fn health_check_recovers_demo_mode() {
    let (addr, _db) = start_server();
    let session = session_for(config_for(addr), Arc::new(MemoryStorage::new()));
    let transport = session.api().transport();
    let mode = transport.mode();

    assert!(transport.check_backend_health());
    assert!(!mode.is_active());
}
