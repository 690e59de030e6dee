use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pagewright_core::DataBag;
use pagewright_template::{compile, render};

const TEMPLATE: &str = r#"
<section class="hero">
  <h1>{{service_name}} in {{area_name}}, {{state}}</h1>
  <p>{{description}}</p>
  <p class="price">Starting at {{starting_price}}</p>
  <a href="tel:{{phone}}">{{phone}}</a>
</section>
<ul class="benefits">
  {{#local_benefits}}<li>{{this}}</li>{{/local_benefits}}
</ul>
<footer style="color: {{colors.primary}}">{{business_name}} &middot; {{company.email}}</footer>
"#;

fn bag_for(city: &str) -> DataBag {
    let mut company = DataBag::new();
    company.insert("email", "office@acme.test");
    let mut colors = DataBag::new();
    colors.insert("primary", "#1d4ed8");

    let mut data = DataBag::new();
    data.insert("service_name", "Roof Repair");
    data.insert("area_name", city);
    data.insert("state", "LA");
    data.insert("description", "Leak detection and shingle replacement.");
    data.insert("starting_price", "$1,500");
    data.insert("phone", "(504) 555-0100");
    data.insert("business_name", "Acme Roofing");
    data.insert(
        "local_benefits",
        vec![
            "Fast response".to_string(),
            "Licensed techs".to_string(),
            "Free estimates".to_string(),
        ],
    );
    data.insert("company", company);
    data.insert("colors", colors);
    data
}

fn bench_compile_once_apply_many(c: &mut Criterion) {
    let bags: Vec<DataBag> = (0..50).map(|i| bag_for(&format!("City {}", i))).collect();

    c.bench_function("template/compile_once_apply_50", |b| {
        b.iter(|| {
            let compiled = compile(black_box(TEMPLATE)).expect("compile template");
            for bag in &bags {
                black_box(compiled.apply(bag));
            }
        });
    });

    c.bench_function("template/compile_per_apply_50", |b| {
        b.iter(|| {
            for bag in &bags {
                black_box(render(black_box(TEMPLATE), bag).expect("render template"));
            }
        });
    });
}

fn bench_large_document(c: &mut Criterion) {
    let large = TEMPLATE.repeat(200);
    let bag = bag_for("Metairie");
    c.bench_function("template/render_large", |b| {
        b.iter(|| black_box(render(black_box(&large), &bag).expect("render template")));
    });
}

criterion_group!(benches, bench_compile_once_apply_many, bench_large_document);
criterion_main!(benches);
