pub mod att;
pub mod bell;
pub mod rogers;
pub mod telus;
pub mod tmobile;
pub mod verizon;

use crate::auth::{AuthStrategy, CodeSource, RelayClient};
use crate::config::Config;
use crate::models::{Carrier, ScraperType};
use crate::scrapers::ScraperStrategy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct StrategyBinding {
    pub auth: Arc<dyn AuthStrategy>,
    pub scraper: Arc<dyn ScraperStrategy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BindingInfo {
    pub carrier: Carrier,
    pub scraper_type: ScraperType,
    pub login_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BindingsResponse {
    pub bindings: Vec<BindingInfo>,
    pub total: usize,
}

/// Read-only (carrier, scraper type) -> strategy table, populated once at
/// startup. Lookups after that are plain map hits.
pub struct StrategyRegistry {
    bindings: HashMap<(Carrier, ScraperType), StrategyBinding>,
}

impl StrategyRegistry {
    /// Production wiring: strategies that need a second factor poll the
    /// relay service over HTTP.
    pub fn new(config: Arc<Config>) -> Self {
        let source: Arc<dyn CodeSource> = Arc::new(RelayClient::from_config(&config));
        Self::with_code_source(config, source)
    }

    /// Same table with an injected factor source (in-process store, test
    /// double).
    pub fn with_code_source(config: Arc<Config>, source: Arc<dyn CodeSource>) -> Self {
        let mut bindings = HashMap::new();

        let bell_auth: Arc<dyn AuthStrategy> =
            Arc::new(bell::BellAuth::new(&config, source.clone()));
        let telus_auth: Arc<dyn AuthStrategy> = Arc::new(telus::TelusAuth::new(&config));
        let rogers_auth: Arc<dyn AuthStrategy> = Arc::new(rogers::RogersAuth::new(&config));
        let att_auth: Arc<dyn AuthStrategy> = Arc::new(att::AttAuth::new(&config, source.clone()));
        let tmobile_auth: Arc<dyn AuthStrategy> =
            Arc::new(tmobile::TmobileAuth::new(&config, source.clone()));
        let verizon_auth: Arc<dyn AuthStrategy> =
            Arc::new(verizon::VerizonAuth::new(&config, source));

        let mut bind = |auth: &Arc<dyn AuthStrategy>, scraper: Arc<dyn ScraperStrategy>| {
            bindings.insert(
                (scraper.carrier(), scraper.scraper_type()),
                StrategyBinding {
                    auth: auth.clone(),
                    scraper,
                },
            );
        };

        bind(&bell_auth, Arc::new(bell::monthly_reports_scraper()));
        bind(&bell_auth, Arc::new(bell::daily_usage_scraper()));
        bind(&bell_auth, Arc::new(bell::pdf_invoice_scraper()));
        bind(&telus_auth, Arc::new(telus::monthly_reports_scraper()));
        bind(&rogers_auth, Arc::new(rogers::monthly_reports_scraper()));
        bind(&rogers_auth, Arc::new(rogers::daily_usage_scraper()));
        bind(&att_auth, Arc::new(att::daily_usage_scraper()));
        bind(&att_auth, Arc::new(att::monthly_reports_scraper()));
        bind(&tmobile_auth, Arc::new(tmobile::daily_usage_scraper()));
        bind(&verizon_auth, Arc::new(verizon::monthly_reports_scraper()));
        bind(&verizon_auth, Arc::new(verizon::pdf_invoice_scraper()));

        Self { bindings }
    }

    pub fn auth_strategy(
        &self,
        carrier: Carrier,
        scraper_type: ScraperType,
    ) -> Option<Arc<dyn AuthStrategy>> {
        self.bindings
            .get(&(carrier, scraper_type))
            .map(|b| b.auth.clone())
    }

    pub fn scraper_strategy(
        &self,
        carrier: Carrier,
        scraper_type: ScraperType,
    ) -> Option<Arc<dyn ScraperStrategy>> {
        self.bindings
            .get(&(carrier, scraper_type))
            .map(|b| b.scraper.clone())
    }

    pub fn bindings_info(&self) -> BindingsResponse {
        let mut bindings: Vec<BindingInfo> = self
            .bindings
            .iter()
            .map(|((carrier, scraper_type), binding)| BindingInfo {
                carrier: *carrier,
                scraper_type: *scraper_type,
                login_url: binding.auth.login_url(),
            })
            .collect();
        bindings.sort_by_key(|b| (b.carrier.as_str(), b.scraper_type.as_str()));

        BindingsResponse {
            total: bindings.len(),
            bindings,
        }
    }
}
