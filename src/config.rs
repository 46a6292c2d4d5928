use std::env;
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub fee_terms_dir: PathBuf,
    pub stripe_dev_mode: bool,
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:1227".to_string(),
            fee_terms_dir: PathBuf::from("data/fee_terms"),
            stripe_dev_mode: true,
            success_url: "http://127.0.0.1:1227/pay/{student_id}/success".to_string(),
            cancel_url: "http://127.0.0.1:1227/pay/{student_id}".to_string(),
            currency: "inr".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `.env` (if present) then the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let stripe_dev_mode = match env::var("STRIPE_DEV_MODE") {
            Ok(v) => parse_bool(&v)
                .ok_or_else(|| AppError::Config(format!("STRIPE_DEV_MODE must be true/false, got {}", v)))?,
            Err(_) => defaults.stripe_dev_mode,
        };

        let currency = env::var("PAYMENT_CURRENCY")
            .map(|c| c.to_lowercase())
            .unwrap_or(defaults.currency);
        if currency.len() != 3 {
            return Err(AppError::Config(format!("PAYMENT_CURRENCY must be an ISO code, got {}", currency)));
        }

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            fee_terms_dir: env::var("FEE_TERMS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.fee_terms_dir),
            stripe_dev_mode,
            success_url: env::var("PAYMENT_SUCCESS_URL").unwrap_or(defaults.success_url),
            cancel_url: env::var("PAYMENT_CANCEL_URL").unwrap_or(defaults.cancel_url),
            currency,
        })
    }
}

/// Fills the `{student_id}` placeholder of a redirect URL.
pub fn student_url(template: &str, student_id: &str) -> String {
    template.replace("{student_id}", &urlencoding::encode(student_id))
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
