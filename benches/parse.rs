// benches/parse.rs
use criterion::{criterion_group, criterion_main, Criterion, black_box};

use titan_scrape::catalog::{chassis, Catalog, Document};
use titan_scrape::core::xml::parse;

const GST: &str = include_str!("../tests/fixtures/catalog/titans.gst");
const CAT: &str = include_str!("../tests/fixtures/catalog/legions.cat");

fn docs() -> Vec<Document> {
    vec![
        Document { file: String::from("titans.gst"), root: parse(GST) },
        Document { file: String::from("legions.cat"), root: parse(CAT) },
    ]
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_catalogue", |b| {
        b.iter(|| {
            let root = parse(black_box(CAT));
            black_box(root.children.len())
        })
    });

    let docs = docs();
    c.bench_function("index_and_extract_chassis", |b| {
        b.iter(|| {
            let cat = Catalog::new(black_box(&docs));
            black_box(chassis::extract_all(&cat).len())
        })
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
