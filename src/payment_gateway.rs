use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::student_url;
use crate::error::{AppError, Result};
use crate::summary::PaymentRequest;

/// A hosted checkout the payer is redirected into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
}

/// Turns a payment request into a hosted checkout.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_link(&self, student_id: &str, request: &PaymentRequest) -> Result<PaymentLink>;
}

pub struct StripeClient {
    pub client: reqwest::Client,
    pub base_url: String,
    pub secret_key: String,
    pub dev_mode: bool,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StripeConfig {
    dev_secret_key: Option<String>,
    prod_secret_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    id: String,
    url: Option<String>,
}

impl StripeClient {
    pub fn new(dev_mode: bool) -> Result<Self> {
        let config = Self::load_config()?;
        let key = if dev_mode { config.dev_secret_key } else { config.prod_secret_key };

        match key {
            Some(secret_key) => Ok(Self::with_secret_key(secret_key, dev_mode)),
            _ if dev_mode => Err(AppError::Config("Development keys not found in config".to_string())),
            _ => Err(AppError::Config("Production keys not found in config".to_string())),
        }
    }

    pub fn with_secret_key(secret_key: String, dev_mode: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            base_url: "https://api.stripe.com/v1".to_string(),
            dev_mode,
            currency: "inr".to_string(),
            success_url: String::new(),
            cancel_url: String::new(),
        }
    }

    pub fn with_checkout(mut self, currency: &str, success_url: &str, cancel_url: &str) -> Self {
        self.currency = currency.to_string();
        self.success_url = success_url.to_string();
        self.cancel_url = cancel_url.to_string();
        self
    }

    fn load_config() -> Result<StripeConfig> {
        let config_path = Path::new("auth/stripe.json");

        if !config_path.exists() {
            return Err(AppError::Config("auth/stripe.json file not found".to_string()));
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: StripeConfig = serde_json::from_str(&config_content)?;

        Ok(config)
    }

    /// Form body for a Checkout Session, one line item per fee head.
    fn checkout_form(&self, student_id: &str, request: &PaymentRequest) -> Result<Vec<(String, String)>> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), student_url(&self.success_url, student_id)),
            ("cancel_url".to_string(), student_url(&self.cancel_url, student_id)),
            ("client_reference_id".to_string(), student_id.to_string()),
            ("metadata[student_id]".to_string(), student_id.to_string()),
            ("metadata[fee_term_id]".to_string(), request.fee_term_id.clone()),
        ];

        let mut index = 0;
        for fee in &request.fees {
            let unit_amount = to_minor_units(&fee.amount)?;
            if unit_amount == 0 {
                continue;
            }
            let prefix = format!("line_items[{}]", index);
            form.push((format!("{}[quantity]", prefix), "1".to_string()));
            form.push((format!("{}[price_data][currency]", prefix), self.currency.clone()));
            form.push((format!("{}[price_data][unit_amount]", prefix), unit_amount.to_string()));
            form.push((
                format!("{}[price_data][product_data][name]", prefix),
                format!("{} - {}", fee.fee_term_name, fee.fee_head_name),
            ));
            index += 1;
        }

        if index == 0 {
            return Err(AppError::BadRequest("Nothing outstanding on the selected terms".to_string()));
        }
        Ok(form)
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_payment_link(&self, student_id: &str, request: &PaymentRequest) -> Result<PaymentLink> {
        let url = format!("{}/checkout/sessions", self.base_url);
        let form_data = self.checkout_form(student_id, request)?;

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, Some(""))
            .form(&form_data)
            .send()
            .await?;

        if response.status().is_success() {
            let session: CheckoutSession = response.json().await?;
            let url = session
                .url
                .ok_or_else(|| AppError::Gateway(format!("Checkout session {} has no url", session.id)))?;
            tracing::info!("Created checkout session {} for {}", session.id, student_id);
            Ok(PaymentLink { id: session.id, url })
        } else {
            let error_text = response.text().await?;
            Err(AppError::Gateway(format!("Stripe API Error: {}", error_text)))
        }
    }
}

/// Amount in the currency's smallest unit (paise, cents).
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64> {
    let minor = (amount * BigDecimal::from(100)).round(0);
    match minor.to_i64() {
        Some(v) if v >= 0 => Ok(v),
        _ => Err(AppError::BadRequest(format!("Invalid payment amount {}", amount))),
    }
}
