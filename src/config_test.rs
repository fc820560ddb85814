use super::*;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_guard() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// # Safety
/// Callers must hold `env_guard()` so env mutations don't race.
unsafe fn clear_market_env() {
    unsafe {
        std::env::remove_var("MARKET_API_BASE_URL");
        std::env::remove_var("MARKET_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("MARKET_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("MARKET_TOKEN_FILE");
        std::env::remove_var("MARKET_COOKIE_FILE");
        std::env::remove_var("MARKET_NFT_PAGE_SIZE");
    }
}

#[test]
fn from_env_defaults() {
    let _env = env_guard();
    unsafe { clear_market_env() };

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg, ClientConfig::default());
    assert_eq!(cfg.base_url, DEFAULT_API_BASE_URL);
    assert_eq!(cfg.timeouts.request(), Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
    assert_eq!(cfg.page_size, 24);
}

#[test]
fn from_env_parses_overrides() {
    let _env = env_guard();
    unsafe {
        clear_market_env();
        std::env::set_var("MARKET_API_BASE_URL", "https://market.example.test/api/");
        std::env::set_var("MARKET_REQUEST_TIMEOUT_SECS", "42");
        std::env::set_var("MARKET_CONNECT_TIMEOUT_SECS", " 7 ");
        std::env::set_var("MARKET_TOKEN_FILE", "/tmp/market-session.json");
        std::env::set_var("MARKET_COOKIE_FILE", "/tmp/market-cookies.json");
        std::env::set_var("MARKET_NFT_PAGE_SIZE", "12");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.base_url, "https://market.example.test/api");
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 42, connect_secs: 7 });
    assert_eq!(cfg.token_file, PathBuf::from("/tmp/market-session.json"));
    assert_eq!(cfg.cookie_file, PathBuf::from("/tmp/market-cookies.json"));
    assert_eq!(cfg.page_size, 12);

    unsafe { clear_market_env() };
}

#[test]
fn from_env_rejects_unparseable_numbers() {
    let _env = env_guard();
    unsafe {
        clear_market_env();
        std::env::set_var("MARKET_NFT_PAGE_SIZE", "lots");
    }

    let err = ClientConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { var: "MARKET_NFT_PAGE_SIZE", .. }));
    assert!(err.to_string().contains("lots"));

    unsafe { clear_market_env() };
}

#[test]
fn from_env_rejects_zero_page_size() {
    let _env = env_guard();
    unsafe {
        clear_market_env();
        std::env::set_var("MARKET_NFT_PAGE_SIZE", "0");
    }

    let err = ClientConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { var: "MARKET_NFT_PAGE_SIZE", .. }));
    assert!(err.to_string().contains("\"0\""));

    unsafe { clear_market_env() };
}

#[test]
fn from_env_rejects_zero_timeouts() {
    let _env = env_guard();
    for var in ["MARKET_REQUEST_TIMEOUT_SECS", "MARKET_CONNECT_TIMEOUT_SECS"] {
        unsafe {
            clear_market_env();
            std::env::set_var(var, " 0 ");
        }

        let err = ClientConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: v, .. } if v == var));
    }

    unsafe { clear_market_env() };
}

#[test]
fn with_base_url_trims_trailing_slashes() {
    let cfg = ClientConfig::default().with_base_url("http://localhost:9000/api//");
    assert_eq!(cfg.base_url, "http://localhost:9000/api");
}
