//! PAGEWRIGHT Test Utilities
//!
//! Shared test infrastructure for the PAGEWRIGHT workspace:
//! - Proptest generators for data bags, templates and records
//! - Fixtures for the Roof Repair / Metairie scenario
//! - A pre-seeded in-memory content store

pub use pagewright_storage::{MemoryCacheStore, MemoryContentStore};

pub use pagewright_core::{
    page_path, CompanySettings, DataBag, EntityId, GeneratedPage, LocalOverride, PageTemplate,
    Service, ServiceArea, SiteSettings, StaticPage, Timestamp, Value,
};

use chrono::Utc;
use pagewright_core::new_entity_id;
use std::collections::BTreeMap;

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies.

    use super::*;
    use pagewright_storage::InvalidationEvent;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_entity_id() -> impl Strategy<Value = EntityId> {
        any::<u128>().prop_map(Uuid::from_u128)
    }

    /// URL-safe slugs such as `roof-repair`.
    pub fn arb_slug() -> impl Strategy<Value = String> {
        "[a-z]{2,10}(-[a-z]{2,8}){0,2}"
    }

    /// Prices from $0 to $1,000,000 in cents.
    pub fn arb_cents() -> impl Strategy<Value = i64> {
        0i64..100_000_000
    }

    /// Phone numbers in assorted punctuation styles.
    pub fn arb_phone() -> impl Strategy<Value = String> {
        ("[2-9][0-9]{2}", "[0-9]{3}", "[0-9]{4}", 0usize..4).prop_map(|(a, b, c, style)| {
            match style {
                0 => format!("{}{}{}", a, b, c),
                1 => format!("({}) {}-{}", a, b, c),
                2 => format!("{}.{}.{}", a, b, c),
                _ => format!("+1 {}-{}-{}", a, b, c),
            }
        })
    }

    /// Scalar display text, including characters that look like tags.
    pub fn arb_display_text() -> impl Strategy<Value = String> {
        "[A-Za-z0-9 ,.$(){}#/-]{0,24}"
    }

    pub fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            arb_display_text().prop_map(Value::Scalar),
            prop::collection::vec(arb_display_text(), 0..4).prop_map(Value::List),
        ];
        leaf.prop_recursive(2, 12, 4, |inner| {
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Nested(m.into_iter().collect()))
        })
    }

    pub fn arb_data_bag() -> impl Strategy<Value = DataBag> {
        prop::collection::btree_map("[a-z_]{1,10}", arb_value(), 0..8)
            .prop_map(|m| m.into_iter().collect())
    }

    /// Template-like markup mixing HTML, valid tags and brace noise.
    pub fn arb_template_source() -> impl Strategy<Value = String> {
        let piece = prop_oneof![
            "[a-z <>/=\"]{0,12}",
            "[a-z_]{1,8}".prop_map(|k| format!("{{{{{}}}}}", k)),
            "[a-z_]{1,6}\\.[a-z_]{1,6}".prop_map(|k| format!("{{{{ {} }}}}", k)),
            "[a-z_]{1,8}".prop_map(|k| format!("{{{{#{k}}}}}{{{{this}}}}{{{{/{k}}}}}")),
            Just("{{".to_string()),
            Just("}}".to_string()),
        ];
        prop::collection::vec(piece, 0..12).prop_map(|parts| parts.concat())
    }

    pub fn arb_invalidation_event() -> impl Strategy<Value = InvalidationEvent> {
        let id = || proptest::option::of(arb_entity_id());
        prop_oneof![
            Just(InvalidationEvent::Company),
            Just(InvalidationEvent::SiteSettings),
            id().prop_map(|id| InvalidationEvent::Service { id }),
            id().prop_map(|id| InvalidationEvent::Area { id }),
            id().prop_map(|id| InvalidationEvent::Template { id }),
            arb_slug().prop_map(|slug| InvalidationEvent::StaticPage { slug }),
        ]
    }

    pub fn arb_service() -> impl Strategy<Value = Service> {
        (arb_entity_id(), arb_slug(), "[A-Z][a-z]{2,10}( [A-Z][a-z]{2,8})?", proptest::option::of(arb_cents()))
            .prop_map(|(service_id, slug, name, starting_price_cents)| Service {
                service_id,
                name,
                slug,
                category: None,
                description: None,
                starting_price_cents,
                template_id: None,
                html_draft: None,
                published_html: None,
                published_at: None,
                updated_at: Utc::now(),
            })
    }

    pub fn arb_area() -> impl Strategy<Value = ServiceArea> {
        (arb_entity_id(), arb_slug(), "[A-Z][a-z]{2,12}", proptest::option::of("[A-Z]{2}"))
            .prop_map(|(area_id, slug, city_name, state)| ServiceArea {
                area_id,
                city_name,
                slug,
                display_name: None,
                state,
                zip: None,
                updated_at: Utc::now(),
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// Service-page template used throughout the scenario tests.
    pub const SERVICE_TEMPLATE_HTML: &str = r#"<section class="hero">
  <h1>{{service_name}} in {{area_name}}</h1>
  <p class="price">Starting at {{starting_price}}</p>
  <p>{{description}}</p>
</section>
<ul class="benefits">{{#local_benefits}}<li>{{this}}</li>{{/local_benefits}}</ul>
<a class="cta" href="tel:{{phone}}" data-popup-trigger="quote">Call {{business_name}} at {{phone}}</a>"#;

    /// Draft for the published "about" page. Carries its own shell.
    pub const ABOUT_DRAFT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><title>About {{business_name}}</title><meta name="description" content="{{slogan}}"></head>
<body>
<h1>About {{business_name}}</h1>
<p>{{years_experience}} years serving {{city}}.</p>
<p style="color: {{colors.primary}}">Call {{phone}}</p>
</body>
</html>"#;

    pub fn acme_company() -> CompanySettings {
        CompanySettings {
            business_name: "Acme Roofing".to_string(),
            slogan: Some("Roofs done right".to_string()),
            phone: Some("504.555.0100".to_string()),
            email: Some("office@acme.test".to_string()),
            address_line1: Some("100 Canal St".to_string()),
            address_line2: None,
            city: Some("New Orleans".to_string()),
            state: Some("LA".to_string()),
            zip: Some("70112".to_string()),
            years_experience: Some(25),
            logo_url: None,
            icon_url: None,
            description: Some("Family-owned roofing contractor.".to_string()),
        }
    }

    pub fn acme_theme() -> SiteSettings {
        let mut colors = BTreeMap::new();
        colors.insert("primary".to_string(), "#1d4ed8".to_string());
        colors.insert("accent".to_string(), "#f59e0b".to_string());
        let mut radii = BTreeMap::new();
        radii.insert("card".to_string(), "12px".to_string());
        SiteSettings {
            colors,
            radii,
            icon_stroke_width: Some("1.5".to_string()),
        }
    }

    pub fn service_template() -> PageTemplate {
        PageTemplate {
            template_id: new_entity_id(),
            name: "Service page".to_string(),
            html: SERVICE_TEMPLATE_HTML.to_string(),
            html_draft: None,
            updated_at: Utc::now(),
        }
    }

    /// Roof Repair, $1,500 starting price.
    pub fn roof_repair(template_id: Option<EntityId>) -> Service {
        Service {
            service_id: new_entity_id(),
            name: "Roof Repair".to_string(),
            slug: "roof-repair".to_string(),
            category: Some("Roofing".to_string()),
            description: Some("Leak detection and shingle replacement.".to_string()),
            starting_price_cents: Some(150000),
            template_id,
            html_draft: None,
            published_html: None,
            published_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn area(city: &str, slug: &str) -> ServiceArea {
        ServiceArea {
            area_id: new_entity_id(),
            city_name: city.to_string(),
            slug: slug.to_string(),
            display_name: None,
            state: Some("LA".to_string()),
            zip: None,
            updated_at: Utc::now(),
        }
    }

    pub fn metairie() -> ServiceArea {
        area("Metairie", "metairie")
    }

    pub fn kenner() -> ServiceArea {
        area("Kenner", "kenner")
    }

    pub fn metairie_override(service_id: EntityId, area_id: EntityId) -> LocalOverride {
        LocalOverride {
            service_id,
            area_id,
            local_description: Some("Metairie's trusted roof repair team.".to_string()),
            local_benefits: vec!["Fast response".to_string(), "Licensed techs".to_string()],
            response_time: Some("Same day".to_string()),
            completion_time: None,
            customer_count: Some(420),
            pricing_notes: None,
            meta_title: None,
            meta_description: None,
        }
    }

    pub fn about_page() -> StaticPage {
        StaticPage {
            page_id: new_entity_id(),
            slug: "about".to_string(),
            title: "About us".to_string(),
            html_draft: Some(ABOUT_DRAFT_HTML.to_string()),
            published_html: None,
            published_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Everything the Roof Repair scenario seeds, with handles to each record.
    #[derive(Debug, Clone)]
    pub struct Scenario {
        pub store: MemoryContentStore,
        pub company: CompanySettings,
        pub site: SiteSettings,
        pub template: PageTemplate,
        pub service: Service,
        pub metairie: ServiceArea,
        pub kenner: ServiceArea,
        pub local_override: LocalOverride,
        pub about: StaticPage,
        /// `/metairie/roof-repair`
        pub metairie_path: String,
        /// `/kenner/roof-repair`
        pub kenner_path: String,
    }

    /// A store seeded with the Roof Repair scenario: one service, two areas
    /// (only Metairie has localized copy), one template, an unpublished
    /// "about" page, and a stale generated page for each area.
    pub fn seeded_store() -> Scenario {
        let store = MemoryContentStore::new();
        let company = acme_company();
        let site = acme_theme();
        let template = service_template();
        let service = roof_repair(Some(template.template_id));
        let metairie = metairie();
        let kenner = kenner();
        let local_override = metairie_override(service.service_id, metairie.area_id);
        let about = about_page();
        let metairie_path = page_path(&metairie.slug, &service.slug);
        let kenner_path = page_path(&kenner.slug, &service.slug);

        let seed = || -> pagewright_core::PagewrightResult<()> {
            store.put_company(company.clone())?;
            store.put_site(site.clone())?;
            store.put_template(template.clone())?;
            store.put_service(service.clone())?;
            store.put_area(metairie.clone())?;
            store.put_area(kenner.clone())?;
            store.put_override(local_override.clone())?;
            store.put_static_page(about.clone())?;
            for (path, area) in [(&metairie_path, &metairie), (&kenner_path, &kenner)] {
                store.put_page(GeneratedPage::new(
                    path.clone(),
                    service.service_id,
                    area.area_id,
                    Some(template.template_id),
                ))?;
            }
            Ok(())
        };
        // A fresh store has no poisoned locks.
        if let Err(err) = seed() {
            panic!("seeding fixture store failed: {}", err);
        }

        Scenario {
            store,
            company,
            site,
            template,
            service,
            metairie,
            kenner,
            local_override,
            about,
            metairie_path,
            kenner_path,
        }
    }
}
