//! Page Data Assembler
//!
//! Builds the data bag a template is applied to. One layer is built per
//! source record and the layers are overlaid lowest precedence first:
//!
//! site theme < company < service (+ derived defaults) < area < local override
//!
//! Every upstream fetch is bounded by the configured timeout and read through
//! the cache store.

use pagewright_core::{
    format_cents, format_cents_amount, normalize_phone, CompanySettings, DataBag, EntityId,
    EntityType, GeneratedPage, LocalOverride, PageTemplate, PagewrightResult, Service,
    ServiceArea, SiteSettings, StorageError, Value,
};
use pagewright_storage::{get_json, set_json, CacheBackend, CacheKey, ContentStore};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::telemetry::metrics;

/// Everything a service page render needs besides its template.
#[derive(Debug, Clone)]
pub struct PageInputs {
    pub service: Service,
    pub area: ServiceArea,
    pub bag: DataBag,
}

impl PageInputs {
    /// Template that renders this page: the page's own reference, falling
    /// back to the service's.
    pub fn template_id(&self, page: &GeneratedPage) -> Option<EntityId> {
        page.template_id.or(self.service.template_id)
    }
}

/// Gathers records through the cache and builds data bags.
#[derive(Clone)]
pub struct PageDataAssembler {
    store: Arc<dyn ContentStore>,
    cache: Arc<dyn CacheBackend>,
    fetch_timeout: Duration,
    site_base_url: String,
}

impl PageDataAssembler {
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn CacheBackend>,
        fetch_timeout: Duration,
        site_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            fetch_timeout,
            site_base_url: site_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    // ========================================================================
    // READ-THROUGH FETCHES
    // ========================================================================

    /// Run one store operation, giving up after the fetch timeout.
    pub async fn bounded<T, F>(&self, operation: &str, op: F) -> PagewrightResult<T>
    where
        F: Future<Output = PagewrightResult<T>>,
    {
        match tokio::time::timeout(self.fetch_timeout, op).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation = %operation,
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "Store operation timed out"
                );
                Err(StorageError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: self.fetch_timeout.as_millis() as u64,
                }
                .into())
            }
        }
    }

    /// Read `key` from the cache, falling back to `fetch` bounded by the
    /// fetch timeout. Found records are cached; absent ones are not. Cache
    /// failures degrade to a direct fetch.
    async fn read_through<T, F>(&self, key: String, fetch: F) -> PagewrightResult<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: Future<Output = PagewrightResult<Option<T>>>,
    {
        match get_json::<T, _>(self.cache.as_ref(), &key).await {
            Ok(Some(hit)) => {
                record_cache("get", "hit");
                return Ok(Some(hit));
            }
            Ok(None) => record_cache("get", "miss"),
            Err(e) => {
                record_cache("get", "error");
                tracing::warn!(key = %key, error = %e, "Cache read failed, fetching directly");
            }
        }

        let fetched = self.bounded(&key, fetch).await?;

        if let Some(record) = &fetched {
            if let Err(e) = set_json(self.cache.as_ref(), &key, record, None).await {
                record_cache("set", "error");
                tracing::warn!(key = %key, error = %e, "Cache write failed");
            } else {
                record_cache("set", "ok");
            }
        }
        Ok(fetched)
    }

    pub async fn company(&self) -> PagewrightResult<Option<CompanySettings>> {
        self.read_through(CacheKey::company(), self.store.company_settings())
            .await
    }

    pub async fn site(&self) -> PagewrightResult<Option<SiteSettings>> {
        self.read_through(CacheKey::site(), self.store.site_settings())
            .await
    }

    pub async fn service(&self, id: EntityId) -> PagewrightResult<Option<Service>> {
        self.read_through(CacheKey::service(id), self.store.service_get(id))
            .await
    }

    pub async fn area(&self, id: EntityId) -> PagewrightResult<Option<ServiceArea>> {
        self.read_through(CacheKey::area(id), self.store.area_get(id))
            .await
    }

    pub async fn local_override(
        &self,
        service_id: EntityId,
        area_id: EntityId,
    ) -> PagewrightResult<Option<LocalOverride>> {
        self.read_through(
            CacheKey::local_override(service_id, area_id),
            self.store.local_override_get(service_id, area_id),
        )
        .await
    }

    pub async fn template(&self, id: EntityId) -> PagewrightResult<Option<PageTemplate>> {
        self.read_through(CacheKey::template(id), self.store.template_get(id))
            .await
    }

    // ========================================================================
    // ASSEMBLY
    // ========================================================================

    /// Assemble the full data bag for a generated page.
    ///
    /// Company and site records are optional; the service and area are not.
    pub async fn assemble(&self, page: &GeneratedPage) -> PagewrightResult<PageInputs> {
        let (company, site, service, area, local) = tokio::join!(
            self.company(),
            self.site(),
            self.service(page.service_id),
            self.area(page.area_id),
            self.local_override(page.service_id, page.area_id),
        );

        let service = service?
            .ok_or_else(|| StorageError::not_found(EntityType::Service, page.service_id))?;
        let area =
            area?.ok_or_else(|| StorageError::not_found(EntityType::Area, page.area_id))?;
        let company = company?.unwrap_or_default();
        let site = site?.unwrap_or_default();
        let local = local?;

        let bag = assemble_bag(
            &site,
            &company,
            &service,
            &area,
            local.as_ref(),
            &page.url_path,
            &self.site_base_url,
        );
        Ok(PageInputs { service, area, bag })
    }

    /// Site and company layers only. Static page drafts are published
    /// against this bag.
    pub async fn site_bag(&self) -> PagewrightResult<DataBag> {
        let (company, site) = tokio::join!(self.company(), self.site());
        let mut bag = site_layer(&site?.unwrap_or_default());
        bag.overlay(company_layer(&company?.unwrap_or_default()));
        Ok(bag)
    }

    /// Site, company and service layers. Service drafts are published
    /// against this bag.
    pub async fn service_bag(&self, service: &Service) -> PagewrightResult<DataBag> {
        let mut bag = self.site_bag().await?;
        bag.overlay(service_layer(service));
        Ok(bag)
    }
}

fn record_cache(op: &str, result: &str) {
    if let Some(m) = metrics() {
        m.record_cache_op(op, result);
    }
}

// ============================================================================
// LAYERS
// ============================================================================

/// Overlay every layer in precedence order.
pub fn assemble_bag(
    site: &SiteSettings,
    company: &CompanySettings,
    service: &Service,
    area: &ServiceArea,
    local: Option<&LocalOverride>,
    url_path: &str,
    site_base_url: &str,
) -> DataBag {
    let mut bag = site_layer(site);
    bag.overlay(company_layer(company));
    bag.overlay(service_layer(service));
    bag.overlay(derived_layer(service, area, company, url_path, site_base_url));
    bag.overlay(area_layer(area));
    bag.overlay(override_layer(local));
    bag
}

fn token_bag(tokens: &std::collections::BTreeMap<String, String>) -> DataBag {
    tokens
        .iter()
        .map(|(k, v)| (k.clone(), Value::Scalar(v.clone())))
        .collect()
}

/// Theme tokens, verbatim.
pub fn site_layer(site: &SiteSettings) -> DataBag {
    let mut bag = DataBag::new();
    bag.insert("colors", token_bag(&site.colors))
        .insert("radius", token_bag(&site.radii))
        .insert_opt("icon_stroke_width", site.icon_stroke_width.as_ref());
    bag
}

/// Single-line postal address from whichever parts are present.
fn single_line_address(company: &CompanySettings) -> Option<String> {
    let locality = match (&company.city, &company.state, &company.zip) {
        (Some(city), Some(state), Some(zip)) => Some(format!("{}, {} {}", city, state, zip)),
        (Some(city), Some(state), None) => Some(format!("{}, {}", city, state)),
        (Some(city), None, Some(zip)) => Some(format!("{} {}", city, zip)),
        (None, Some(state), Some(zip)) => Some(format!("{} {}", state, zip)),
        (city, state, zip) => city.clone().or_else(|| state.clone()).or_else(|| zip.clone()),
    };
    let parts: Vec<String> = [
        company.address_line1.clone(),
        company.address_line2.clone(),
        locality,
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.trim().is_empty())
    .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Company profile, flat and under `company.*`.
pub fn company_layer(company: &CompanySettings) -> DataBag {
    let mut fields = DataBag::new();
    fields
        .insert("business_name", company.business_name.as_str())
        .insert_opt("slogan", company.slogan.as_ref())
        .insert_opt("phone", company.phone.as_deref().map(normalize_phone))
        .insert_opt("phone_raw", company.phone.as_ref())
        .insert_opt("email", company.email.as_ref())
        .insert_opt("address", single_line_address(company))
        .insert_opt("address_line1", company.address_line1.as_ref())
        .insert_opt("address_line2", company.address_line2.as_ref())
        .insert_opt("city", company.city.as_ref())
        .insert_opt("state", company.state.as_ref())
        .insert_opt("zip", company.zip.as_ref())
        .insert_opt("years_experience", company.years_experience)
        .insert_opt("logo_url", company.logo_url.as_ref())
        .insert_opt("icon_url", company.icon_url.as_ref())
        .insert_opt("description", company.description.as_ref());

    let mut bag = fields.clone();
    bag.insert("company", fields);
    bag
}

/// Service definition, flat and under `service.*`. Prices are formatted here
/// and never reach a template as raw cents.
pub fn service_layer(service: &Service) -> DataBag {
    let price = service.starting_price_cents.map(format_cents);
    let amount = service
        .starting_price_cents
        .map(|cents| format_cents_amount(cents.unsigned_abs()));

    let mut nested = DataBag::new();
    nested
        .insert("name", service.name.as_str())
        .insert("slug", service.slug.as_str())
        .insert_opt("category", service.category.as_ref())
        .insert_opt("description", service.description.as_ref())
        .insert_opt("starting_price", price.clone())
        .insert_opt("starting_price_amount", amount.clone());

    let mut bag = DataBag::new();
    bag.insert("service_name", service.name.as_str())
        .insert("service_slug", service.slug.as_str())
        .insert_opt("service_category", service.category.as_ref())
        .insert_opt("description", service.description.as_ref())
        .insert_opt("starting_price", price)
        .insert_opt("starting_price_amount", amount)
        .insert("service", nested);
    bag
}

/// Defaults computed from several records. Sits just above the service layer
/// so area and override records can replace them.
pub fn derived_layer(
    service: &Service,
    area: &ServiceArea,
    company: &CompanySettings,
    url_path: &str,
    site_base_url: &str,
) -> DataBag {
    let place = match &area.state {
        Some(state) => format!("{}, {}", area.name(), state),
        None => area.name().to_string(),
    };
    let meta_title = if company.business_name.trim().is_empty() {
        format!("{} in {}", service.name, place)
    } else {
        format!("{} in {} | {}", service.name, place, company.business_name)
    };
    let meta_description = service
        .description
        .clone()
        .unwrap_or_else(|| format!("{} in {}", service.name, place));

    let mut bag = DataBag::new();
    bag.insert("meta_title", meta_title)
        .insert("meta_description", meta_description)
        .insert("url_path", url_path)
        .insert("canonical_url", format!("{}{}", site_base_url, url_path));
    bag
}

/// Area record, flat and under `area.*`.
pub fn area_layer(area: &ServiceArea) -> DataBag {
    let mut nested = DataBag::new();
    nested
        .insert("city_name", area.city_name.as_str())
        .insert("slug", area.slug.as_str())
        .insert("name", area.name())
        .insert_opt("state", area.state.as_ref())
        .insert_opt("zip", area.zip.as_ref());

    let mut bag = DataBag::new();
    bag.insert("city", area.city_name.as_str())
        .insert("city_name", area.city_name.as_str())
        .insert("area_slug", area.slug.as_str())
        .insert("area_name", area.name())
        .insert_opt("state", area.state.as_ref())
        .insert_opt("zip", area.zip.as_ref())
        .insert("area", nested);
    bag
}

/// Localized copy. The benefit lists are always present, empty when there is
/// no override, so list blocks over them render nothing rather than leaving
/// their markers behind.
pub fn override_layer(local: Option<&LocalOverride>) -> DataBag {
    let mut bag = DataBag::new();
    let benefits = local.map(|l| l.local_benefits.clone()).unwrap_or_default();
    bag.insert("local_benefits", benefits.clone())
        .insert("benefits", benefits);

    if let Some(local) = local {
        bag.insert_opt("description", local.local_description.as_ref())
            .insert_opt("local_description", local.local_description.as_ref())
            .insert_opt("response_time", local.response_time.as_ref())
            .insert_opt("completion_time", local.completion_time.as_ref())
            .insert_opt("customer_count", local.customer_count)
            .insert_opt("pricing_notes", local.pricing_notes.as_ref())
            .insert_opt("meta_title", local.meta_title.as_ref())
            .insert_opt("meta_description", local.meta_description.as_ref());
    }
    bag
}
